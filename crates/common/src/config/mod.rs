//! Configuration management for ScrapeDeck services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Scraping/table API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Recently viewed jobs store
    #[serde(default)]
    pub recents: RecentsConfig,

    /// Job creation workflow timings
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Account finder defaults
    #[serde(default)]
    pub finder: FinderConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Operator sessions unused for this long are dropped
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the scraping/table API
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// Header carrying the tenant identifier
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecentsConfig {
    /// File backing the client-local recents list
    #[serde(default = "default_recents_path")]
    pub path: PathBuf,

    /// Number of entries kept
    #[serde(default = "default_recents_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// How long a failure stays visible before the wizard resets
    #[serde(default = "default_error_dwell")]
    pub error_dwell_ms: u64,

    /// How long the finished progress bar stays at 100%
    #[serde(default = "default_success_dwell")]
    pub success_dwell_ms: u64,

    /// Run provisioning without remote calls
    #[serde(default)]
    pub simulate: bool,

    /// Total duration of a simulated run
    #[serde(default = "default_simulated_duration")]
    pub simulated_duration_ms: u64,

    /// Progress tick for simulated runs
    #[serde(default = "default_simulated_tick")]
    pub simulated_tick_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FinderConfig {
    /// Target scrape count offered by default
    #[serde(default = "default_scrape_count")]
    pub default_scrape_count: u32,

    /// Gender filter sent with scrape requests
    #[serde(default = "default_target_gender")]
    pub target_gender: String,

    /// Delay before a completed progress bar returns to idle
    #[serde(default = "default_finder_reset")]
    pub progress_reset_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 300 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_session_idle() -> u64 { 4 * 3600 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_api_base_url() -> String { "http://localhost:5001".to_string() }
fn default_api_timeout() -> u64 { 120 }
fn default_tenant_header() -> String { crate::tenant::BASE_ID_HEADER.to_string() }
fn default_recents_path() -> PathBuf { PathBuf::from("data/recents.json") }
fn default_recents_capacity() -> usize { crate::recents::MAX_RECENTS }
fn default_error_dwell() -> u64 { 3000 }
fn default_success_dwell() -> u64 { 1500 }
fn default_simulated_duration() -> u64 { 3000 }
fn default_simulated_tick() -> u64 { 50 }
fn default_scrape_count() -> u32 { 150 }
fn default_target_gender() -> String { "male".to_string() }
fn default_finder_reset() -> u64 { 2000 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "scrapedeck".to_string() }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout(),
            tenant_header: default_tenant_header(),
        }
    }
}

impl Default for RecentsConfig {
    fn default() -> Self {
        Self {
            path: default_recents_path(),
            capacity: default_recents_capacity(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            error_dwell_ms: default_error_dwell(),
            success_dwell_ms: default_success_dwell(),
            simulate: false,
            simulated_duration_ms: default_simulated_duration(),
            simulated_tick_ms: default_simulated_tick(),
        }
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            default_scrape_count: default_scrape_count(),
            target_gender: default_target_gender(),
            progress_reset_ms: default_finder_reset(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl WorkflowConfig {
    pub fn error_dwell(&self) -> Duration {
        Duration::from_millis(self.error_dwell_ms)
    }

    pub fn success_dwell(&self) -> Duration {
        Duration::from_millis(self.success_dwell_ms)
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("database.url", "postgres://localhost/scrapedeck")?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__API__BASE_URL=http://scraper:5001
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.server.session_idle_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
                session_idle_secs: default_session_idle(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/scrapedeck".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            api: ApiConfig::default(),
            recents: RecentsConfig::default(),
            workflow: WorkflowConfig::default(),
            finder: FinderConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
