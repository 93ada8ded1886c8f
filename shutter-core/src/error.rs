//! Error types for Shutter

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using ShutterError
pub type Result<T> = std::result::Result<T, ShutterError>;

/// Main error type for Shutter operations
///
/// Errors are `Clone` so that a single failure can be handed to the
/// listener and returned through the capture task at the same time.
#[derive(Debug, Clone, Error)]
pub enum ShutterError {
    /// The host surface is gone or no longer operable
    #[error("Host surface is not running")]
    HostNotRunning,

    /// Orchestrator construction attempted without a valid surface
    #[error("Invalid host state: {0}")]
    InvalidHostState(String),

    /// Capture provider reported a failure
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Another capture is still in flight
    #[error("Capture already in progress, please wait")]
    Busy,

    /// Provider did not resolve within the configured bound
    #[error("Capture timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unsupported operation
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ShutterError>,
    },
}

/// Coarse classification of a [`ShutterError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    HostNotRunning,
    InvalidHostState,
    CaptureFailed,
    Busy,
    Timeout,
    Config,
    Unsupported,
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::HostNotRunning => "host-not-running",
            Self::InvalidHostState => "invalid-host-state",
            Self::CaptureFailed => "capture-failed",
            Self::Busy => "busy",
            Self::Timeout => "timeout",
            Self::Config => "config",
            Self::Unsupported => "unsupported",
            Self::Io => "io",
        };
        write!(f, "{}", name)
    }
}

impl ShutterError {
    /// Create an invalid host state error
    pub fn invalid_host_state(msg: impl Into<String>) -> Self {
        Self::InvalidHostState(msg.into())
    }

    /// Create a capture failure
    pub fn capture_failed(msg: impl Into<String>) -> Self {
        Self::CaptureFailed(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify this error, looking through any context layers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::HostNotRunning => ErrorKind::HostNotRunning,
            Self::InvalidHostState(_) => ErrorKind::InvalidHostState,
            Self::CaptureFailed(_) => ErrorKind::CaptureFailed,
            Self::Busy => ErrorKind::Busy,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Config(_) => ErrorKind::Config,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Io(_) => ErrorKind::Io,
            Self::WithContext { source, .. } => source.kind(),
        }
    }

    /// Normalize an error coming out of a capture provider
    ///
    /// Provider failures always surface as [`ErrorKind::CaptureFailed`].
    /// Errors that already have that kind pass through untouched; anything
    /// else is wrapped with its message preserved.
    pub fn into_capture_failure(self) -> Self {
        if self.kind() == ErrorKind::CaptureFailed {
            self
        } else {
            Self::CaptureFailed(self.to_string())
        }
    }

    /// Get a user-friendly hint for resolving this error
    pub fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::HostNotRunning => {
                Some("Attach a live surface before capturing. Is the host still running?")
            }
            Self::InvalidHostState(_) => {
                Some("The surface may already be torn down. Attach a valid surface first.")
            }
            Self::Busy => Some("Wait for the current capture to finish and try again."),
            Self::Timeout(_) => {
                Some("Increase capture.timeout_ms in config.toml or check the capture provider.")
            }
            Self::Config(_) => Some("Check ~/.config/shutter/config.toml for syntax errors."),
            Self::WithContext { source, .. } => source.user_hint(),
            _ => None,
        }
    }

    /// Whether the caller can reasonably retry after fixing its own state
    pub fn is_user_recoverable(&self) -> bool {
        match self {
            Self::HostNotRunning
            | Self::CaptureFailed(_)
            | Self::Busy
            | Self::Timeout(_)
            | Self::Config(_) => true,
            Self::InvalidHostState(_) | Self::Unsupported(_) | Self::Io(_) => false,
            Self::WithContext { source, .. } => source.is_user_recoverable(),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

// Conversions from external error types

impl From<std::io::Error> for ShutterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<image::ImageError> for ShutterError {
    fn from(err: image::ImageError) -> Self {
        Self::CaptureFailed(format!("Image encoding failed: {}", err))
    }
}
