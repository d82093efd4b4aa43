//! API handlers module

pub mod configure;
pub mod dashboard;
pub mod health;
pub mod jobs;
pub mod recents;
pub mod sessions;

use scrapedeck_common::errors::{AppError, Result};
use validator::Validate;

/// Run derive-based validation on a request body
pub(crate) fn validate_request<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|e| {
        let field = e.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: e.to_string(),
            field,
        }
    })
}
