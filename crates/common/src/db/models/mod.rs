//! SeaORM entity models
//!
//! Database entities for PatentDesk

mod activity_log;
mod attachment;
mod department;
mod evaluation;
mod patent;
mod patent_classification;
mod title;
mod title_user;
mod user;

pub use department::{
    Entity as DepartmentEntity,
    Model as Department,
    ActiveModel as DepartmentActiveModel,
    Column as DepartmentColumn,
};

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
    Permission,
    UnknownPermission,
};

pub use title::{
    Entity as TitleEntity,
    Model as Title,
    ActiveModel as TitleActiveModel,
    Column as TitleColumn,
    AccessPolicy,
    next_title_no,
};

pub use title_user::{
    Entity as TitleUserEntity,
    Model as TitleUser,
    ActiveModel as TitleUserActiveModel,
    Column as TitleUserColumn,
};

pub use patent::{
    Entity as PatentEntity,
    Model as Patent,
    ActiveModel as PatentActiveModel,
    Column as PatentColumn,
    STATUS_EVALUATED,
    STATUS_UNEVALUATED,
};

pub use evaluation::{
    Entity as EvaluationEntity,
    Model as Evaluation,
    ActiveModel as EvaluationActiveModel,
    Column as EvaluationColumn,
    EvaluationState,
};

pub use patent_classification::{
    Entity as PatentClassificationEntity,
    Model as PatentClassification,
    ActiveModel as PatentClassificationActiveModel,
    Column as PatentClassificationColumn,
};

pub use attachment::{
    Entity as AttachmentEntity,
    Model as Attachment,
    ActiveModel as AttachmentActiveModel,
    Column as AttachmentColumn,
};

pub use activity_log::{
    Entity as ActivityLogEntity,
    Model as ActivityLog,
    ActiveModel as ActivityLogActiveModel,
    Column as ActivityLogColumn,
};
