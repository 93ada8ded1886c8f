//! CLI command implementations

mod capture;
mod config;

pub use capture::{capture, CaptureArgs};
pub use config::{config, ConfigArgs};
