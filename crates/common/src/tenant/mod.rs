//! Tenant context
//!
//! Every tenant-scoped call carries an explicit [`TenantContext`]. The tenant
//! identifier is the external base id (`appXXXXXXXXXXXXXX`); it is forwarded
//! to the scraping API as the `X-Base-Id` header and written into the
//! `base_id` partition column of every tenant-scoped table.

use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use uuid::Uuid;

/// Header carrying the tenant identifier on every outbound and inbound request
pub const BASE_ID_HEADER: &str = "X-Base-Id";

static BASE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"app[A-Za-z0-9]{14}").expect("base id pattern"));

static BASE_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(airtable\.com|www\.airtable\.com)/.+").expect("base url pattern")
});

/// Tenant partition key. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BaseId(String);

impl BaseId {
    /// Accept any non-blank identifier
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::MissingTenant);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BaseId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        BaseId::parse(&value)
    }
}

impl From<BaseId> for String {
    fn from(id: BaseId) -> Self {
        id.0
    }
}

impl AsRef<str> for BaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check a submitted base link against the accepted provider URL shape
pub fn is_valid_base_url(url: &str) -> bool {
    BASE_URL_PATTERN.is_match(url.trim())
}

/// Validate a submitted base link, returning the trimmed URL
pub fn validate_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidBaseUrl {
            message: "Airtable link is required".to_string(),
        });
    }
    if !is_valid_base_url(trimmed) {
        return Err(AppError::InvalidBaseUrl {
            message: "Please enter a valid Airtable URL".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Pull the base id out of a base link
pub fn extract_base_id(url: &str) -> Result<BaseId> {
    BASE_ID_PATTERN
        .find(url)
        .map(|m| BaseId(m.as_str().to_string()))
        .ok_or_else(|| AppError::InvalidFormat {
            message: "Could not extract base ID from the Airtable URL".to_string(),
        })
}

/// Explicit per-request tenant context
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Tenant partition key
    pub base_id: BaseId,

    /// Request ID for tracing
    pub request_id: String,
}

impl TenantContext {
    pub fn new(base_id: BaseId) -> Self {
        Self {
            base_id,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Build a context from a raw identifier, failing when it is blank
    pub fn from_raw(raw: &str) -> Result<Self> {
        BaseId::parse(raw).map(Self::new)
    }

    pub fn base_id(&self) -> &str {
        self.base_id.as_str()
    }

    /// Reject access to a record owned by another tenant
    pub fn ensure_owns(&self, owner: Option<&str>) -> Result<()> {
        match owner {
            Some(owner) if owner == self.base_id() => Ok(()),
            _ => Err(AppError::TenantMismatch),
        }
    }
}

/// Axum extractor for TenantContext
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let raw = parts
            .headers
            .get(BASE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::MissingTenant)?;

        Ok(TenantContext {
            base_id: BaseId::parse(raw)?,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_base_id_rejected() {
        assert!(matches!(BaseId::parse(""), Err(AppError::MissingTenant)));
        assert!(matches!(BaseId::parse("   "), Err(AppError::MissingTenant)));
        assert!(matches!(TenantContext::from_raw(""), Err(AppError::MissingTenant)));
        assert_eq!(BaseId::parse(" appABC ").unwrap().as_str(), "appABC");
    }

    #[test]
    fn test_base_url_validation() {
        assert!(is_valid_base_url("https://airtable.com/appAbCdEfGhIjKlMn/tblX"));
        assert!(is_valid_base_url("http://www.airtable.com/appAbCdEfGhIjKlMn"));
        assert!(is_valid_base_url("HTTPS://AIRTABLE.COM/x"));
        assert!(!is_valid_base_url("https://airtable.com/"));
        assert!(!is_valid_base_url("https://notairtable.com/appAbCdEfGhIjKlMn"));
        assert!(!is_valid_base_url("airtable.com/appAbCdEfGhIjKlMn"));

        assert!(matches!(
            validate_base_url("  "),
            Err(AppError::InvalidBaseUrl { message }) if message.contains("required")
        ));
        assert!(matches!(
            validate_base_url("https://example.com/app"),
            Err(AppError::InvalidBaseUrl { message }) if message.contains("valid")
        ));
    }

    #[test]
    fn test_extract_base_id() {
        let id = extract_base_id("https://airtable.com/appAbCdEfGhIjKlMn/tblQwErTy/viwZ").unwrap();
        assert_eq!(id.as_str(), "appAbCdEfGhIjKlMn");

        assert!(extract_base_id("https://airtable.com/shrSomething").is_err());
        assert!(extract_base_id("https://airtable.com/appShort").is_err());
    }

    #[test]
    fn test_ensure_owns() {
        let ctx = TenantContext::from_raw("appAbCdEfGhIjKlMn").unwrap();
        assert!(ctx.ensure_owns(Some("appAbCdEfGhIjKlMn")).is_ok());
        assert!(matches!(ctx.ensure_owns(Some("appOther0000000000")), Err(AppError::TenantMismatch)));
        assert!(matches!(ctx.ensure_owns(None), Err(AppError::TenantMismatch)));
    }

    #[test]
    fn test_base_id_serde() {
        let id: BaseId = serde_json::from_str("\"appAbCdEfGhIjKlMn\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"appAbCdEfGhIjKlMn\"");
        assert!(serde_json::from_str::<BaseId>("\"\"").is_err());
    }
}
