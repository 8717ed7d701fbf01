//! Editorial Common Library
//!
//! Core of the editorial workflow service:
//! - Document store adapter with compare-and-swap version tokens
//! - Typed collection repositories with conflict retry
//! - Submission lifecycle state machine and assignment engine
//! - Bounded audit log, access codes, notifier abstraction
//! - Error types, configuration and metrics helpers

pub mod assignment;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod lifecycle;
pub mod metrics;
pub mod notify;
pub mod services;

// Re-export commonly used types
pub use auth::Actor;
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use notify::Outcome;
pub use services::Editorial;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
