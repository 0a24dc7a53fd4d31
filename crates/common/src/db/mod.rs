//! Database layer for PatentDesk
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management and embedded migrations

pub mod models;
mod repository;

pub use repository::{
    apply_fields, clamp_page, regenerate_classifications, ClassificationCount, NewActivity,
    NewAssignment, NewAttachment, NewDepartment, NewEvaluation, NewPatent, NewTitle, NewUser,
    Page, Repository, TitleBundle,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Database connection pool wrapper
///
/// Constructed once at start-up and handed to every service through
/// [`Repository`]; cloning shares the underlying pool.
#[derive(Clone)]
pub struct DbPool {
    conn: Arc<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(true);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::Internal {
                message: format!("Failed to connect to database: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection (mock connections in tests)
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn: Arc::new(conn) }
    }

    /// Apply the embedded SQL migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(self.conn.get_postgres_connection_pool())
            .await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::Internal {
                message: format!("Database ping failed: {}", e),
            })?;
        Ok(())
    }

    /// Close the pool at shutdown. When other handles are still alive the
    /// pool is left to close on the last drop.
    pub async fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(conn) => conn.close().await?,
            Err(_) => warn!("Database pool still shared at shutdown; skipping explicit close"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_clones_share_one_mock_connection() {
        let pool = DbPool::from_connection(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let shared = pool.clone();
        assert!(std::ptr::eq(pool.conn(), shared.conn()));

        drop(shared);
        tokio_test::assert_ok!(pool.close().await);
    }
}
