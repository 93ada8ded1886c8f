//! Capture orchestration
//!
//! Gates every capture on the attached surface being alive, hands valid
//! requests to the capture provider and reports the outcome both through
//! the returned [`CaptureTask`] and through the registered listener.
//!
//! ```text
//! Idle ─▶ Validating ─┬─▶ Rejected ───────────────┐
//!                     └─▶ Started ─┬─▶ Succeeded ─┼─▶ Idle
//!                                  └─▶ Failed ────┘
//! ```

use parking_lot::Mutex;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::capture::{CaptureFuture, CaptureProvider};
use crate::config::ShutterConfig;
use crate::error::{Result, ShutterError};
use crate::listener::ListenerHandle;
use crate::logging;
use crate::notify::{Notification, NotificationContext};
use crate::surface::{Surface, SurfaceReferenceManager};
use crate::types::{CaptureOutcome, CaptureRequest, Handle};

const MESSAGE_HOST_NOT_RUNNING: &str = "Is the host surface still running?";

/// Drives captures of the attached host surface
///
/// Construct one per process through [`OrchestratorCell`], or directly with
/// [`CaptureOrchestrator::new`] when the composition root already guarantees
/// a single instance.
pub struct CaptureOrchestrator {
    /// Most recently attached surface
    surfaces: SurfaceReferenceManager,
    /// Performs the actual capture
    provider: Arc<dyn CaptureProvider>,
    /// Single listener slot
    listeners: ListenerHandle,
    /// Notifier thread delivering listener callbacks
    notifier: NotificationContext,
    /// Held while a capture owns the single-flight guard
    in_flight: Arc<FlightSlot>,
    /// Runtime options
    config: ShutterConfig,
}

impl CaptureOrchestrator {
    /// Create an orchestrator bound to `surface` and `provider`
    ///
    /// Fails with [`ShutterError::InvalidHostState`] if `surface` is not
    /// alive right now.
    pub fn new(
        surface: &Arc<dyn Surface>,
        provider: Arc<dyn CaptureProvider>,
        config: ShutterConfig,
    ) -> Result<Self> {
        Self::construct(surface, || provider, config)
    }

    fn construct(
        surface: &Arc<dyn Surface>,
        resolve_provider: impl FnOnce() -> Arc<dyn CaptureProvider>,
        config: ShutterConfig,
    ) -> Result<Self> {
        let surfaces = SurfaceReferenceManager::new();
        surfaces.set_surface(surface);

        if surfaces.validated_surface().is_none() {
            if config.logging && logging::enabled() {
                error!("{}", MESSAGE_HOST_NOT_RUNNING);
            }
            return Err(ShutterError::invalid_host_state(format!(
                "surface {} may have been torn down",
                surface.id()
            )));
        }

        let provider = resolve_provider();
        let listeners = ListenerHandle::new();
        let notifier = NotificationContext::new(listeners.clone())?;

        info!(
            "Capture orchestrator ready: surface={}, provider={}, single_flight={}, timeout={:?}",
            surface.id(),
            provider.name(),
            config.single_flight,
            config.capture_timeout
        );

        Ok(Self {
            surfaces,
            provider,
            listeners,
            notifier,
            in_flight: Arc::new(FlightSlot::default()),
            config,
        })
    }

    /// Track a new surface, replacing the previous one
    ///
    /// The surface is not validated here; validation happens per capture.
    pub fn attach(&self, surface: &Arc<dyn Surface>) {
        debug!("Attaching surface {}", surface.id());
        self.surfaces.set_surface(surface);
    }

    /// The attached surface if it is alive right now
    pub fn surface(&self) -> Option<Arc<dyn Surface>> {
        self.surfaces.validated_surface()
    }

    /// Registration handle for the capture listener
    pub fn listener_handle(&self) -> ListenerHandle {
        self.listeners.clone()
    }

    /// Runtime options this orchestrator was built with
    pub fn config(&self) -> &ShutterConfig {
        &self.config
    }

    /// Whether a capture currently holds the single-flight guard
    ///
    /// A guard older than `capture_timeout` no longer counts.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_held(self.config.capture_timeout)
    }

    /// Whether this orchestrator emits failure diagnostics
    ///
    /// Requires both its own `logging` option and the process-wide switch
    /// set by [`configure`](crate::config::configure).
    pub fn diagnostics_enabled(&self) -> bool {
        self.config.logging && logging::enabled()
    }

    /// Start a capture and drive it in the background
    ///
    /// The outcome is only reported to the listener. Returns the listener
    /// handle so a listener can be registered in the same expression.
    /// Must be called from within a Tokio runtime.
    pub fn capture(&self, request: CaptureRequest) -> Result<ListenerHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ShutterError::unsupported("capture requires a Tokio runtime"))?;

        let task = self.capture_async(request);
        runtime.spawn(async move {
            // The outcome already reached the listener
            let _ = task.await;
        });

        Ok(self.listener_handle())
    }

    /// Start a capture and return its result for the caller to await
    ///
    /// Validation, the single-flight check and the start notification
    /// happen immediately. The provider's work only runs once the returned
    /// task is polled. The task resolves after the terminal notification
    /// has been delivered; dropping it unpolled abandons the capture and
    /// emits no terminal notification.
    pub fn capture_async(&self, request: CaptureRequest) -> CaptureTask {
        let handle = request.handle();
        let diagnostics = self.diagnostics_enabled();

        let Some(surface) = self.surfaces.validated_surface() else {
            if diagnostics {
                warn!("{}: {}", handle, MESSAGE_HOST_NOT_RUNNING);
            }
            return CaptureTask::rejected(handle, ShutterError::HostNotRunning, &self.notifier);
        };

        let guard = if self.config.single_flight {
            match FlightGuard::acquire(&self.in_flight, self.config.capture_timeout) {
                Some(guard) => Some(guard),
                None => {
                    if diagnostics {
                        warn!("{}: rejected, another capture is in flight", handle);
                    }
                    return CaptureTask::rejected(handle, ShutterError::Busy, &self.notifier);
                }
            }
        } else {
            None
        };

        if self.listeners.is_set() {
            self.notifier.post(Notification::Started(handle));
        }

        info!(
            "{}: capturing surface {} via {}",
            handle,
            surface.id(),
            self.provider.name()
        );

        // The bound runs from now, not from the first poll
        let deadline = self
            .config
            .capture_timeout
            .map(|limit| (tokio::time::Instant::now() + limit, limit));

        let work = self.provider.capture(surface, request);
        CaptureTask::run(
            handle,
            work,
            guard,
            deadline,
            diagnostics,
            self.notifier.clone(),
        )
    }
}

impl std::fmt::Debug for CaptureOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureOrchestrator")
            .field("provider", &self.provider.name())
            .field("surfaces", &self.surfaces)
            .field("listeners", &self.listeners)
            .field("busy", &self.is_busy())
            .field("config", &self.config)
            .finish()
    }
}

/// Who holds the single-flight guard, and since when
#[derive(Debug, Default)]
struct FlightSlot {
    holder: Mutex<Option<Flight>>,
    next_id: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
struct Flight {
    id: u64,
    since: Instant,
}

impl Flight {
    fn expired(&self, limit: Option<Duration>) -> bool {
        limit.is_some_and(|limit| self.since.elapsed() >= limit)
    }
}

impl FlightSlot {
    fn is_held(&self, limit: Option<Duration>) -> bool {
        matches!(*self.holder.lock(), Some(flight) if !flight.expired(limit))
    }
}

/// Single-flight guard, released when dropped
///
/// A guard held past `limit` (for example by a task that is never polled)
/// expires and may be taken over by the next acquirer.
struct FlightGuard {
    slot: Arc<FlightSlot>,
    id: u64,
}

impl FlightGuard {
    fn acquire(slot: &Arc<FlightSlot>, limit: Option<Duration>) -> Option<Self> {
        let mut holder = slot.holder.lock();

        if let Some(flight) = holder.as_ref() {
            if !flight.expired(limit) {
                return None;
            }
            debug!("Taking over single-flight guard held for {:?}", flight.since.elapsed());
        }

        let id = slot.next_id.fetch_add(1, Ordering::Relaxed);
        *holder = Some(Flight {
            id,
            since: Instant::now(),
        });

        Some(Self {
            slot: slot.clone(),
            id,
        })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut holder = self.slot.holder.lock();
        // An expired guard must not release its successor
        if matches!(*holder, Some(flight) if flight.id == self.id) {
            *holder = None;
        }
    }
}

/// Pending result of one capture
///
/// Lazy: nothing runs until the task is polled. Resolves exactly once to
/// the artifact location or the capture error.
#[must_use = "a capture task does nothing unless awaited"]
pub struct CaptureTask {
    handle: Handle,
    inner: Pin<Box<dyn Future<Output = Result<PathBuf>> + Send>>,
}

impl CaptureTask {
    fn rejected(handle: Handle, error: ShutterError, notifier: &NotificationContext) -> Self {
        let notifier = notifier.clone();
        Self {
            handle,
            inner: Box::pin(async move {
                notifier
                    .deliver(Notification::Failed(handle, error.clone()))
                    .await;
                Err(error)
            }),
        }
    }

    fn run(
        handle: Handle,
        work: CaptureFuture,
        guard: Option<FlightGuard>,
        deadline: Option<(tokio::time::Instant, Duration)>,
        diagnostics: bool,
        notifier: NotificationContext,
    ) -> Self {
        let inner = async move {
            let result = match deadline {
                Some((deadline, limit)) => match tokio::time::timeout_at(deadline, work).await {
                    Ok(result) => result.map_err(ShutterError::into_capture_failure),
                    Err(_) => Err(ShutterError::Timeout(limit)),
                },
                None => work.await.map_err(ShutterError::into_capture_failure),
            };

            // Free the guard before listeners run so they can start the next capture
            drop(guard);

            match &result {
                Ok(artifact) => {
                    info!("{}: capture complete: {:?}", handle, artifact);
                    notifier
                        .deliver(Notification::Completed(handle, artifact.clone()))
                        .await;
                }
                Err(e) => {
                    if diagnostics {
                        error!("{}: screenshot capture failed: {}", handle, e);
                    }
                    notifier
                        .deliver(Notification::Failed(handle, e.clone()))
                        .await;
                }
            }

            result
        };

        Self {
            handle,
            inner: Box::pin(inner),
        }
    }

    /// Handle of the request this task runs
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Await the task and convert its result into a [`CaptureOutcome`]
    pub async fn outcome(self) -> CaptureOutcome {
        self.await.into()
    }
}

impl Future for CaptureTask {
    type Output = Result<PathBuf>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for CaptureTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureTask")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Resolves a capture provider when the orchestrator is first built
pub type ProviderFactory = Box<dyn Fn() -> Arc<dyn CaptureProvider> + Send + Sync>;

/// Holds the process's single orchestrator
///
/// The first successful [`attach`](Self::attach) constructs the
/// orchestrator; later calls only re-point it at the new surface.
/// Concurrent first calls are serialized so exactly one instance is built.
pub struct OrchestratorCell {
    config: ShutterConfig,
    factory: ProviderFactory,
    instance: Mutex<Option<Arc<CaptureOrchestrator>>>,
}

impl OrchestratorCell {
    /// Create an empty cell
    ///
    /// `factory` is called once, when the orchestrator is constructed.
    pub fn new(
        config: ShutterConfig,
        factory: impl Fn() -> Arc<dyn CaptureProvider> + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            factory: Box::new(factory),
            instance: Mutex::new(None),
        }
    }

    /// Get the orchestrator, creating it on first use
    ///
    /// Only the constructing call validates `surface`; later calls store it
    /// unconditionally.
    pub fn attach(&self, surface: &Arc<dyn Surface>) -> Result<Arc<CaptureOrchestrator>> {
        let mut instance = self.instance.lock();

        if let Some(orchestrator) = instance.as_ref() {
            orchestrator.attach(surface);
            return Ok(orchestrator.clone());
        }

        let orchestrator = Arc::new(CaptureOrchestrator::construct(
            surface,
            || (self.factory)(),
            self.config.clone(),
        )?);
        *instance = Some(orchestrator.clone());

        Ok(orchestrator)
    }

    /// The orchestrator, if it has been constructed
    pub fn get(&self) -> Option<Arc<CaptureOrchestrator>> {
        self.instance.lock().clone()
    }
}

impl std::fmt::Debug for OrchestratorCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorCell")
            .field("config", &self.config)
            .field("initialized", &self.instance.lock().is_some())
            .finish()
    }
}
