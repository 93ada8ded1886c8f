//! Host surface tracking
//!
//! The orchestrator never owns the surface it captures. It keeps a
//! [`Weak`] reference and re-checks [`Surface::is_alive`] every time the
//! surface is handed out, so a torn-down host is detected even if something
//! else still holds it in memory.

use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::error::{Result, ShutterError};
use crate::logging;
use crate::types::Frame;

/// A host-owned visual region that can be captured
pub trait Surface: Send + Sync {
    /// Identity used in logs
    fn id(&self) -> String;

    /// True while the surface exists and is in an operable state
    fn is_alive(&self) -> bool;

    /// Surface dimensions in pixels, `(0, 0)` when unknown
    ///
    /// Rendered frames must match a known size.
    fn size(&self) -> (u32, u32) {
        (0, 0)
    }

    /// Render the surface into an RGBA frame
    ///
    /// Only needed by providers that draw the surface themselves, such as
    /// [`SnapshotProvider`](crate::capture::SnapshotProvider).
    fn render(&self) -> Result<Frame> {
        Err(ShutterError::unsupported(format!(
            "surface {} does not support rendering",
            self.id()
        )))
    }
}

/// Non-owning reference to a surface
#[derive(Clone)]
pub struct SurfaceReference {
    surface: Weak<dyn Surface>,
}

impl SurfaceReference {
    /// Reference `surface` without extending its lifetime
    pub fn new(surface: &Arc<dyn Surface>) -> Self {
        Self {
            surface: Arc::downgrade(surface),
        }
    }

    /// The surface, if it still exists and reports itself alive
    pub fn validated(&self) -> Option<Arc<dyn Surface>> {
        self.surface.upgrade().filter(|surface| surface.is_alive())
    }
}

impl std::fmt::Debug for SurfaceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceReference")
            .field("live_refs", &self.surface.strong_count())
            .finish()
    }
}

/// Holds the most recently attached surface
///
/// A surface returned by [`validated_surface`](Self::validated_surface) is a
/// snapshot: it was alive when returned, but callers that touch it later
/// must check [`Surface::is_alive`] again.
#[derive(Debug, Default)]
pub struct SurfaceReferenceManager {
    current: RwLock<Option<SurfaceReference>>,
}

impl SurfaceReferenceManager {
    /// Create a manager with no surface attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `surface`, replacing any previous one
    ///
    /// No validation happens here.
    pub fn set_surface(&self, surface: &Arc<dyn Surface>) {
        *self.current.write() = Some(SurfaceReference::new(surface));
    }

    /// The stored surface if it is valid right now
    pub fn validated_surface(&self) -> Option<Arc<dyn Surface>> {
        let surface = self.current.read().as_ref().and_then(SurfaceReference::validated);
        if surface.is_none() && logging::enabled() {
            debug!("No live surface attached");
        }
        surface
    }

    /// Whether a surface was ever attached, alive or not
    pub fn has_surface(&self) -> bool {
        self.current.read().is_some()
    }
}
