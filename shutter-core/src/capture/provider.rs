//! Capture provider interface

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;
use crate::surface::Surface;
use crate::types::CaptureRequest;

/// Lazy capture computation resolving to the artifact location
pub type CaptureFuture = Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'static>>;

/// Performs the actual pixel capture and artifact write
///
/// The orchestrator calls [`capture`](Self::capture) only after it has
/// validated `surface`. The returned future must not start any work until
/// it is polled; slow work belongs on a background context such as
/// [`tokio::task::spawn_blocking`].
pub trait CaptureProvider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        "provider"
    }

    /// Build the capture computation for `surface` and `request`
    fn capture(&self, surface: Arc<dyn Surface>, request: CaptureRequest) -> CaptureFuture;
}
