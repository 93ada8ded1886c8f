//! Notification context
//!
//! Listener callbacks never run on the thread that finished a capture.
//! They are queued to a single named notifier thread which drains the queue
//! in order, so for one capture the start event is always delivered before
//! its terminal event.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::error::{Result, ShutterError};
use crate::listener::ListenerHandle;
use crate::types::Handle;

/// Name of the thread every listener callback runs on
pub const NOTIFIER_THREAD_NAME: &str = "shutter-notify";

/// A listener callback waiting to be delivered
#[derive(Debug, Clone)]
pub enum Notification {
    Started(Handle),
    Completed(Handle, PathBuf),
    Failed(Handle, ShutterError),
}

struct Envelope {
    notification: Notification,
    delivered: Option<oneshot::Sender<()>>,
}

/// Handle to the notifier thread
///
/// Cloning shares the same thread. The thread exits once every clone has
/// been dropped.
#[derive(Clone)]
pub struct NotificationContext {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl NotificationContext {
    /// Spawn the notifier thread delivering to whatever `listeners` holds
    pub fn new(listeners: ListenerHandle) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name(NOTIFIER_THREAD_NAME.to_string())
            .spawn(move || run_notifier(rx, listeners))
            .map_err(|e| {
                ShutterError::from(e).with_context("Failed to spawn notifier thread")
            })?;

        Ok(Self { tx })
    }

    /// Queue a notification without waiting for delivery
    pub fn post(&self, notification: Notification) {
        if self
            .tx
            .send(Envelope {
                notification,
                delivered: None,
            })
            .is_err()
        {
            warn!("Notifier thread is gone, dropping notification");
        }
    }

    /// Queue a notification and wait until the listener has seen it
    pub async fn deliver(&self, notification: Notification) {
        let (done_tx, done_rx) = oneshot::channel();
        let envelope = Envelope {
            notification,
            delivered: Some(done_tx),
        };

        if self.tx.send(envelope).is_err() {
            warn!("Notifier thread is gone, dropping notification");
            return;
        }

        let _ = done_rx.await;
    }
}

fn run_notifier(mut rx: mpsc::UnboundedReceiver<Envelope>, listeners: ListenerHandle) {
    debug!("Notifier thread started");

    while let Some(envelope) = rx.blocking_recv() {
        dispatch(&listeners, &envelope.notification);
        if let Some(done) = envelope.delivered {
            let _ = done.send(());
        }
    }

    debug!("Notifier thread exiting");
}

fn dispatch(listeners: &ListenerHandle, notification: &Notification) {
    // Read the slot now, not when the notification was queued
    let Some(listener) = listeners.current() else {
        trace!("No listener registered, skipping {:?}", notification);
        return;
    };

    let result = catch_unwind(AssertUnwindSafe(|| match notification {
        Notification::Started(handle) => listener.on_capture_started(*handle),
        Notification::Completed(handle, artifact) => {
            listener.on_capture_complete(*handle, artifact)
        }
        Notification::Failed(handle, error) => listener.on_capture_failed(*handle, error),
    }));

    if result.is_err() {
        warn!("Capture listener panicked while handling {:?}", notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::CaptureListener;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::sync::Arc;

    #[derive(Default)]
    struct ThreadRecorder {
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl CaptureListener for Arc<ThreadRecorder> {
        fn on_capture_started(&self, _handle: Handle) {
            self.record("started");
        }

        fn on_capture_complete(&self, _handle: Handle, _artifact: &Path) {
            self.record("complete");
        }
    }

    impl ThreadRecorder {
        fn record(&self, what: &str) {
            let thread = std::thread::current().name().map(str::to_string);
            self.seen.lock().push((what.to_string(), thread));
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order_on_notifier_thread() {
        let listeners = ListenerHandle::new();
        let recorder = Arc::new(ThreadRecorder::default());
        listeners.set(recorder.clone());

        let context = NotificationContext::new(listeners).unwrap();
        let handle = Handle::new();
        context.post(Notification::Started(handle));
        context
            .deliver(Notification::Completed(handle, PathBuf::from("/tmp/x.png")))
            .await;

        let seen = recorder.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "started");
        assert_eq!(seen[1].0, "complete");
        assert!(seen
            .iter()
            .all(|(_, thread)| thread.as_deref() == Some(NOTIFIER_THREAD_NAME)));
    }

    #[tokio::test]
    async fn test_survives_listener_panic() {
        struct Panicky;
        impl CaptureListener for Panicky {
            fn on_capture_started(&self, _handle: Handle) {
                panic!("listener bug");
            }
        }

        let listeners = ListenerHandle::new();
        listeners.set(Panicky);
        let context = NotificationContext::new(listeners.clone()).unwrap();
        context.deliver(Notification::Started(Handle::new())).await;

        let recorder = Arc::new(ThreadRecorder::default());
        listeners.set(recorder.clone());
        context.deliver(Notification::Started(Handle::new())).await;
        assert_eq!(recorder.seen.lock().len(), 1);
    }
}
