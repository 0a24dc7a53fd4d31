//! Use-case layer between the HTTP handlers and the repository
//!
//! Every service owns a cheap clone of [`Repository`]; [`Services`] wires
//! them together once at start-up.

pub mod access;
pub mod activity;
pub mod attachments;
pub mod auth;
pub mod classifications;
pub mod evaluations;
pub mod exports;
pub mod imports;
pub mod patents;
pub mod titles;
pub mod users;

pub use access::AccessService;
pub use activity::ActivityService;
pub use attachments::{AttachmentDownload, AttachmentService};
pub use auth::{AuthService, ChangePasswordRequest, LoginRequest, LoginResponse};
pub use classifications::{ClassificationService, ClassificationSummary, ReclassifyResult};
pub use evaluations::{
    BatchEvaluationRequest, CreateEvaluationRequest, EvaluationService, UpdateEvaluationRequest,
};
pub use exports::{ExportOutput, ExportRequest, ExportService};
pub use imports::{ImportService, ImportUpload};
pub use patents::{CreatePatentRequest, PatentDetail, PatentService, SetStatusRequest};
pub use titles::{
    AssignmentInput, CopyTitleRequest, CreateTitleRequest, MergeResult, MergeTitlesRequest,
    TitleDetail, TitleService, UpdateTitleRequest,
};
pub use users::{CreateUserRequest, DepartmentRequest, DepartmentService, UpdateUserRequest, UserService};

use crate::auth::JwtManager;
use crate::db::Repository;
use crate::uploads::UploadStore;
use std::sync::Arc;

/// Every service, shared behind `Arc`s
#[derive(Clone)]
pub struct Services {
    pub activity: ActivityService,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub departments: Arc<DepartmentService>,
    pub titles: Arc<TitleService>,
    pub patents: Arc<PatentService>,
    pub evaluations: Arc<EvaluationService>,
    pub classifications: Arc<ClassificationService>,
    pub imports: Arc<ImportService>,
    pub exports: Arc<ExportService>,
    pub attachments: Arc<AttachmentService>,
}

impl Services {
    pub fn new(repo: Repository, jwt: Arc<JwtManager>, uploads: UploadStore) -> Self {
        let access = AccessService::new(repo.clone());
        let activity = ActivityService::new(repo.clone());

        Self {
            auth: Arc::new(AuthService::new(repo.clone(), jwt, activity.clone())),
            users: Arc::new(UserService::new(repo.clone(), activity.clone())),
            departments: Arc::new(DepartmentService::new(repo.clone(), activity.clone())),
            titles: Arc::new(TitleService::new(
                repo.clone(),
                access.clone(),
                activity.clone(),
                uploads.clone(),
            )),
            patents: Arc::new(PatentService::new(repo.clone(), access.clone(), activity.clone())),
            evaluations: Arc::new(EvaluationService::new(repo.clone(), access.clone(), activity.clone())),
            classifications: Arc::new(ClassificationService::new(repo.clone(), access.clone(), activity.clone())),
            imports: Arc::new(ImportService::new(
                repo.clone(),
                access.clone(),
                activity.clone(),
                uploads.clone(),
            )),
            exports: Arc::new(ExportService::new(repo.clone(), access.clone(), activity.clone())),
            attachments: Arc::new(AttachmentService::new(repo, access, activity.clone(), uploads)),
            activity,
        }
    }
}
