//! Repository pattern for database operations
//!
//! One [`Repository`] wraps the pool; each submodule adds the operations for
//! one group of tables. Multi-row writes (title bundles, evaluation batches,
//! patent + classification rows) run inside a single transaction.

mod activity;
mod attachments;
mod classifications;
mod evaluations;
mod patents;
mod titles;
mod users;

pub use activity::NewActivity;
pub use attachments::NewAttachment;
pub use classifications::{regenerate_classifications, ClassificationCount};
pub use evaluations::NewEvaluation;
pub use patents::{apply_fields, NewPatent};
pub use titles::{NewAssignment, NewTitle, TitleBundle};
pub use users::{NewDepartment, NewUser};

use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::Serialize;

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 200;
/// Highest page whose offset still fits a Postgres `bigint`
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PER_PAGE;

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 { 0 } else { total.div_ceil(per_page) };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }

    /// Slice an already filtered in-memory listing
    pub fn from_vec(all: Vec<T>, page: u64, per_page: u64) -> Self {
        let (page, per_page) = clamp_page(Some(page), Some(per_page));
        let total = all.len() as u64;
        let skip = usize::try_from((page - 1) * per_page).unwrap_or(usize::MAX);
        let items = all.into_iter().skip(skip).take(per_page as usize).collect();
        Self::new(items, total, page, per_page)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// 1-based page number and a bounded page size
pub fn clamp_page(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    async fn begin(&self) -> Result<DatabaseTransaction> {
        Ok(self.conn().begin().await?)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(None, None), (1, DEFAULT_PER_PAGE));
        assert_eq!(clamp_page(Some(0), Some(0)), (1, 1));
        assert_eq!(clamp_page(Some(3), Some(10_000)), (3, MAX_PER_PAGE));
        assert_eq!(clamp_page(Some(u64::MAX), Some(u64::MAX)), (MAX_PAGE, MAX_PER_PAGE));
    }

    #[test]
    fn test_page_from_vec() {
        let page = Page::from_vec((1..=45).collect::<Vec<_>>(), 3, 20);
        assert_eq!(page.items, vec![41, 42, 43, 44, 45]);
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);

        let beyond = Page::from_vec(vec![1, 2], 5, 20);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 2);
    }

    #[test]
    fn test_page_from_vec_huge_page_is_empty() {
        let page = Page::<u8>::from_vec(vec![1, 2, 3], u64::MAX, 20);
        assert!(page.items.is_empty());
        assert_eq!(page.page, MAX_PAGE);
        assert_eq!(page.total, 3);
    }
}
