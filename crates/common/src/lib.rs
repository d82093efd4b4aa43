//! ScrapeDeck Common Library
//!
//! Shared code for the operator dashboard:
//! - Tenant context and platform table
//! - Database models, repository and job statistics
//! - Scraping API client
//! - Job creation workflow and account finder
//! - Recently created jobs
//! - Error types, configuration and metrics

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod finder;
pub mod metrics;
pub mod platform;
pub mod recents;
pub mod reset;
pub mod tenant;
pub mod workflow;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use api::{ApiClient, ScraperApi};
pub use config::AppConfig;
pub use db::{DbPool, JobStore, Repository};
pub use errors::{AppError, Result};
pub use platform::Platform;
pub use tenant::{BaseId, TenantContext};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
