//! Capture listener registration
//!
//! A single slot holds at most one listener. Every notification reads the
//! slot when it fires, so replacing the listener while a capture is in
//! flight routes the rest of that capture's events to the new listener.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{ErrorKind, ShutterError};
use crate::types::Handle;

/// Observer of capture lifecycle events
///
/// All callbacks run on the orchestrator's notifier thread.
pub trait CaptureListener: Send + Sync {
    /// A capture passed validation and is about to reach the provider
    fn on_capture_started(&self, _handle: Handle) {}

    /// A capture produced its artifact
    fn on_capture_complete(&self, _handle: Handle, _artifact: &Path) {}

    /// A capture failed
    fn on_capture_failed(&self, _handle: Handle, _error: &ShutterError) {}
}

/// Shared handle to the single listener slot
#[derive(Clone, Default)]
pub struct ListenerHandle {
    slot: Arc<RwLock<Option<Arc<dyn CaptureListener>>>>,
}

impl ListenerHandle {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`, replacing any previous one
    pub fn set(&self, listener: impl CaptureListener + 'static) {
        self.set_shared(Arc::new(listener));
    }

    /// Register an already shared listener, replacing any previous one
    pub fn set_shared(&self, listener: Arc<dyn CaptureListener>) {
        *self.slot.write() = Some(listener);
    }

    /// Remove the current listener
    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    /// The listener registered right now
    pub fn current(&self) -> Option<Arc<dyn CaptureListener>> {
        self.slot.read().clone()
    }

    /// Whether a listener is registered
    pub fn is_set(&self) -> bool {
        self.slot.read().is_some()
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("registered", &self.is_set())
            .finish()
    }
}

/// Owned form of a listener callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum CaptureEvent {
    Started {
        handle: Handle,
    },
    Completed {
        handle: Handle,
        artifact: PathBuf,
    },
    Failed {
        handle: Handle,
        kind: ErrorKind,
        message: String,
    },
}

impl CaptureEvent {
    /// Handle of the capture this event belongs to
    pub fn handle(&self) -> Handle {
        match self {
            Self::Started { handle }
            | Self::Completed { handle, .. }
            | Self::Failed { handle, .. } => *handle,
        }
    }

    /// Whether this is a completion or failure event
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started { .. })
    }
}

/// Listener that forwards every callback into a channel
///
/// Lets async code await capture events instead of implementing
/// [`CaptureListener`].
#[derive(Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: CaptureEvent) {
        // Receiver gone means nobody is interested any more
        let _ = self.tx.send(event);
    }
}

impl CaptureListener for ChannelListener {
    fn on_capture_started(&self, handle: Handle) {
        self.forward(CaptureEvent::Started { handle });
    }

    fn on_capture_complete(&self, handle: Handle, artifact: &Path) {
        self.forward(CaptureEvent::Completed {
            handle,
            artifact: artifact.to_path_buf(),
        });
    }

    fn on_capture_failed(&self, handle: Handle, error: &ShutterError) {
        self.forward(CaptureEvent::Failed {
            handle,
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}
