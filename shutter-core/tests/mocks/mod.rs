//! Mock infrastructure for testing
//!
//! Provides a controllable host surface, a spy capture provider and a
//! recording listener.

#![allow(dead_code)]

use parking_lot::Mutex;
use shutter_core::capture::{CaptureFuture, CaptureProvider};
use shutter_core::error::{Result, ShutterError};
use shutter_core::listener::{CaptureEvent, CaptureListener};
use shutter_core::surface::Surface;
use shutter_core::types::{CaptureRequest, Frame, Handle};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Artifact returned by the spy when the request has no destination
pub const SPY_DEFAULT_ARTIFACT: &str = "/tmp/spy-default.png";

/// Host surface whose liveness is controlled by the test
pub struct MockSurface {
    id: String,
    alive: AtomicBool,
    size: (u32, u32),
}

impl MockSurface {
    /// Create a live surface and return it both concretely and as a trait object
    pub fn new(id: &str) -> (Arc<MockSurface>, Arc<dyn Surface>) {
        Self::with_size(id, 8, 8)
    }

    /// Create a live surface that renders a `width` x `height` gradient
    pub fn with_size(id: &str, width: u32, height: u32) -> (Arc<MockSurface>, Arc<dyn Surface>) {
        let concrete = Arc::new(MockSurface {
            id: id.to_string(),
            alive: AtomicBool::new(true),
            size: (width, height),
        });
        let shared: Arc<dyn Surface> = concrete.clone();
        (concrete, shared)
    }

    /// Simulate host teardown
    pub fn invalidate(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl Surface for MockSurface {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn render(&self) -> Result<Frame> {
        let (width, height) = self.size;
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let r = ((x as f32 / width as f32) * 255.0) as u8;
                let g = ((y as f32 / height as f32) * 255.0) as u8;
                data.extend_from_slice(&[r, g, 128, 255]);
            }
        }
        Frame::new(width, height, data)
    }
}

/// What the spy does when a capture is driven
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Succeed with the request's destination (or the spy default) after `delay`
    Succeed { delay: Duration },
    /// Fail with a provider error
    Fail(String),
    /// Never resolve
    Hang,
}

/// Capture provider that records how it is used
pub struct SpyProvider {
    behavior: Mutex<Behavior>,
    gates: Mutex<VecDeque<oneshot::Receiver<Result<PathBuf>>>>,
    calls: Arc<AtomicUsize>,
    started: Arc<AtomicUsize>,
}

impl SpyProvider {
    /// Spy that succeeds immediately
    pub fn new() -> Arc<Self> {
        Self::with_behavior(Behavior::Succeed {
            delay: Duration::ZERO,
        })
    }

    /// Spy with a fixed behavior
    pub fn with_behavior(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            gates: Mutex::new(VecDeque::new()),
            calls: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Change the behavior for subsequent captures
    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock() = behavior;
    }

    /// Make the next capture wait for the returned sender
    pub fn gate(&self) -> oneshot::Sender<Result<PathBuf>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().push_back(rx);
        tx
    }

    /// Number of times `capture` was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of capture futures that have begun running
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

impl CaptureProvider for SpyProvider {
    fn name(&self) -> &str {
        "spy"
    }

    fn capture(&self, _surface: Arc<dyn Surface>, request: CaptureRequest) -> CaptureFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().pop_front();
        let behavior = self.behavior.lock().clone();
        let started = self.started.clone();
        let artifact = request
            .destination()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(SPY_DEFAULT_ARTIFACT));

        Box::pin(async move {
            started.fetch_add(1, Ordering::SeqCst);

            if let Some(gate) = gate {
                return gate
                    .await
                    .unwrap_or_else(|_| Err(ShutterError::capture_failed("gate dropped")));
            }

            match behavior {
                Behavior::Succeed { delay } => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(artifact)
                }
                Behavior::Fail(message) => Err(ShutterError::capture_failed(message)),
                Behavior::Hang => std::future::pending().await,
            }
        })
    }
}

/// Listener that records every event it sees, tagged with its name
#[derive(Clone)]
pub struct RecordingListener {
    name: &'static str,
    events: Arc<Mutex<Vec<Recorded>>>,
}

/// One recorded callback
#[derive(Debug, Clone)]
pub struct Recorded {
    pub listener: &'static str,
    pub event: CaptureEvent,
    pub thread: Option<String>,
}

impl RecordingListener {
    /// Create a listener named `name`
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a listener sharing `other`'s event log
    pub fn sharing(name: &'static str, other: &RecordingListener) -> Self {
        Self {
            name,
            events: other.events.clone(),
        }
    }

    /// Every event recorded so far
    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    /// Events recorded by the listener called `name`
    pub fn events_for(&self, name: &str) -> Vec<CaptureEvent> {
        self.events
            .lock()
            .iter()
            .filter(|r| r.listener == name)
            .map(|r| r.event.clone())
            .collect()
    }

    fn record(&self, event: CaptureEvent) {
        self.events.lock().push(Recorded {
            listener: self.name,
            event,
            thread: std::thread::current().name().map(str::to_string),
        });
    }
}

impl CaptureListener for RecordingListener {
    fn on_capture_started(&self, handle: Handle) {
        self.record(CaptureEvent::Started { handle });
    }

    fn on_capture_complete(&self, handle: Handle, artifact: &Path) {
        self.record(CaptureEvent::Completed {
            handle,
            artifact: artifact.to_path_buf(),
        });
    }

    fn on_capture_failed(&self, handle: Handle, error: &ShutterError) {
        self.record(CaptureEvent::Failed {
            handle,
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}

/// Poll `condition` until it holds, failing the test after one second
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within one second"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
