//! Capture providers
//!
//! This module handles:
//! - The provider interface the orchestrator delegates to
//! - A reference provider that renders the surface to a PNG file

pub mod provider;
pub mod snapshot;

pub use provider::{CaptureFuture, CaptureProvider};
pub use snapshot::SnapshotProvider;
