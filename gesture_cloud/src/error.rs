//! Error types.
//!
//! Only configuration and window creation can stop the application.  Capture
//! errors are reported through [`crate::capture::CaptureEvent::Failed`] and
//! degrade to "no hand detected" instead.

use std::path::PathBuf;

/// Problems loading or validating [`crate::config::Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("unknown capture backend `{0}` (expected sim, leap or off)")]
    UnknownBackend(String),
}

/// Hand capture could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// No usable backend in this build or configuration.
    #[error("hand capture unsupported: {0}")]
    Unsupported(String),

    /// The backend exists but failed to start (device missing, busy, denied).
    #[error("hand capture failed to start: {0}")]
    StartFailed(String),
}

/// Fatal application errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to open window: {0}")]
    Window(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
