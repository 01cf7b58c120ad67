//! Error types for the rendering collaborator and startup configuration.

use thiserror::Error;

/// Failures talking to the rendering collaborator.
///
/// The pipeline never shows these to users; they collapse into "no results".
#[derive(Debug, Error)]
pub enum FetchError {
    /// The browser session could not be created.
    #[error("failed to start rendering session: {0}")]
    SessionStart(String),

    /// Initial navigation to the listing failed.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The browser failed a command or answered with an unexpected value.
    #[error("browser error: {0}")]
    Browser(String),

    /// The loader deadline elapsed before the page was captured.
    #[error("page load exceeded {0:?}")]
    Timeout(std::time::Duration),
}

/// Invalid configuration, reported once at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid CSS selector for {field} ({selector}): {reason}")]
    Selector {
        field: &'static str,
        selector: String,
        reason: String,
    },

    #[error("invalid value for {key}: {value}")]
    Value { key: &'static str, value: String },

    #[error("invalid site origin {0}")]
    Origin(String),
}
