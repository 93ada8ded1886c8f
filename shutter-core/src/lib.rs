//! Shutter Core Library
//!
//! Lifecycle-aware capture orchestration for host-owned surfaces.
//!
//! This library provides:
//! - A non-owning surface reference that is re-validated before every use
//! - A capture orchestrator that gates, runs and reports capture requests
//! - A single-slot listener registry notified on a dedicated thread
//! - A reference PNG snapshot provider
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │ Host Surface    │───▶│ Orchestrator     │───▶│ Capture Provider │
//! │ (Weak + alive)  │    │ (validate, gate) │    │ (render + write) │
//! └─────────────────┘    └────────┬─────────┘    └──────────────────┘
//!                                 │
//!                        ┌────────▼─────────┐
//!                        │ Notifier thread  │──▶ CaptureListener
//!                        └──────────────────┘
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod notify;
pub mod orchestrator;
pub mod surface;
pub mod types;

pub use capture::{CaptureFuture, CaptureProvider, SnapshotProvider};
pub use config::{configure, ConfigFile, ShutterConfig};
pub use error::{ErrorKind, Result, ShutterError};
pub use listener::{CaptureEvent, CaptureListener, ChannelListener, ListenerHandle};
pub use orchestrator::{CaptureOrchestrator, CaptureTask, OrchestratorCell};
pub use surface::{Surface, SurfaceReference, SurfaceReferenceManager};
pub use types::{CaptureOutcome, CaptureRequest, Frame, Handle, Region};
