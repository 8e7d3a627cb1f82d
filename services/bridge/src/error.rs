//! services/bridge/src/error.rs
//!
//! Defines the primary error type for the bridge service.

use crate::config::ConfigError;
use crate::coordinator::RefreshError;

/// The primary error type for the `bridge` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The first refresh failed in a way a restart will not fix.
    #[error("Refresh error: {0}")]
    Refresh(#[from] RefreshError),

    /// Represents an error building the HTTP client.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
