//! Configuration types for Shutter
//!
//! Provides runtime options for the orchestrator and the on-disk
//! configuration file.

mod file;

pub use file::{sample_config, ConfigFile};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::logging;

/// Runtime options for a capture orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutterConfig {
    /// Emit diagnostic logs for rejected captures and provider failures
    pub logging: bool,
    /// Reject new captures with `Busy` while one is in flight
    pub single_flight: bool,
    /// Upper bound on how long a provider may take (None = unbounded)
    pub capture_timeout: Option<Duration>,
    /// Where providers put captures that have no explicit destination
    pub output_dir: Option<PathBuf>,
}

impl Default for ShutterConfig {
    fn default() -> Self {
        Self {
            logging: true,
            single_flight: true,
            capture_timeout: None,
            output_dir: None,
        }
    }
}

impl ShutterConfig {
    /// Enable or disable diagnostic logging
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Enable or disable the single-flight guard
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Bound provider execution time
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = Some(timeout);
        self
    }

    /// Set the default output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Validate configuration, returning a list of problems
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.capture_timeout == Some(Duration::ZERO) {
            problems.push("capture timeout of zero rejects every capture".to_string());
        }

        if let Some(dir) = &self.output_dir {
            if dir.as_os_str().is_empty() {
                problems.push("output_dir is empty".to_string());
            } else if dir.exists() && !dir.is_dir() {
                problems.push(format!("output_dir {:?} is not a directory", dir));
            }
        }

        problems
    }
}

/// Apply process-wide options
///
/// Only the diagnostic logging switch is process-wide. It takes effect for
/// log statements emitted after this call, including those of captures
/// already in flight, and never changes a capture's outcome.
pub fn configure(config: &ShutterConfig) {
    logging::set_enabled(config.logging);
    debug!("Diagnostic logging {}", if config.logging { "enabled" } else { "disabled" });
}
