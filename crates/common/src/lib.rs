//! PatentDesk Common Library
//!
//! Domain rules and services shared by the PatentDesk gateway:
//! - Database models, repository and migrations
//! - Title permission evaluation, merge planning and evaluation workflow
//! - Classification buckets and the patent field catalogue
//! - CSV import/export and upload storage
//! - Error types, configuration, authentication and metrics

pub mod auth;
pub mod classification;
pub mod config;
pub mod db;
pub mod errors;
pub mod evaluation;
pub mod export;
pub mod fields;
pub mod import;
pub mod merge;
pub mod metrics;
pub mod permission;
pub mod services;
pub mod uploads;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use services::Services;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
