//! Configuration management for the editorial services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values
//!
//! Every field has a default, so an empty environment yields a working
//! in-memory setup.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Document store configuration
    pub store: StoreConfig,

    /// Notification delivery configuration
    pub notifier: NotifierConfig,

    /// Workflow tunables
    pub workflow: WorkflowConfig,

    /// Admin authentication configuration
    pub auth: AuthConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Which document store backend to use
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Version-controlled file host (GitHub contents API)
    Github,
    /// Process-local store; state is lost on restart
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Contents API base URL
    pub api_base: String,

    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Branch holding the data files
    pub branch: String,

    /// API token
    pub token: Option<String>,

    /// Directory of the collection files inside the repository
    pub data_dir: String,

    /// Per-call timeout in seconds
    pub timeout_secs: u64,

    /// Total attempts for one read-modify-write (first try included)
    pub max_attempts: u32,

    /// First backoff delay between attempts, in milliseconds
    pub initial_backoff_ms: u64,

    /// Upper bound of a single backoff delay, in milliseconds
    pub max_backoff_ms: u64,
}

/// Notification delivery backend
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotifierProvider {
    /// Emit notifications to the log only
    Log,
    /// POST structured notifications to a delivery webhook
    Webhook,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub provider: NotifierProvider,

    /// Delivery endpoint for the webhook provider
    pub webhook_url: Option<String>,

    /// Bearer token for the delivery endpoint
    pub api_key: Option<String>,

    /// Sender address handed to the delivery service
    pub from_address: String,

    /// Per-notification timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Number of audit entries retained, newest first
    pub audit_log_capacity: usize,

    /// Fixed prefix of generated editor access codes
    pub access_code_prefix: String,

    /// Seed for the assignment and access-code random sources
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret expected in X-Admin-Key on admin routes (unset disables the check)
    pub admin_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info", "editorial_common=debug")
    pub log_level: String,

    /// Enable JSON logging
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    pub metrics_port: u16,

    /// Service name for logs
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            api_base: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: "master".to_string(),
            token: None,
            data_dir: "data".to_string(),
            timeout_secs: 10,
            max_attempts: 4,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            provider: NotifierProvider::Log,
            webhook_url: None,
            api_key: None,
            from_address: "noreply@gcadr.in".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            audit_log_capacity: 1000,
            access_code_prefix: "gcadr-".to_string(),
            rng_seed: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: true,
            metrics_port: 9090,
            service_name: "editorial".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__STORE__OWNER=gcadr
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: AppConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: AppConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject combinations that cannot work at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Github
            && (self.store.owner.is_empty() || self.store.repo.is_empty())
        {
            return Err(ConfigError::Message(
                "store.owner and store.repo are required for the github backend".to_string(),
            ));
        }
        if self.notifier.provider == NotifierProvider::Webhook && self.notifier.webhook_url.is_none()
        {
            return Err(ConfigError::Message(
                "notifier.webhook_url is required for the webhook provider".to_string(),
            ));
        }
        if self.store.max_attempts == 0 {
            return Err(ConfigError::Message(
                "store.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.workflow.audit_log_capacity == 0 {
            return Err(ConfigError::Message(
                "workflow.audit_log_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl StoreConfig {
    /// Per-call store timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl NotifierConfig {
    /// Per-notification timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
