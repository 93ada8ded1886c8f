//! Capture command - render the test pattern through the orchestrator

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::{json, Value};
use shutter_core::{
    configure, CaptureEvent, CaptureListener, CaptureOutcome, CaptureProvider, CaptureRequest,
    ChannelListener, ConfigFile, Frame, Handle, OrchestratorCell, Region, ShutterError,
    SnapshotProvider, Surface,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Arguments for the capture command
#[derive(Args)]
pub struct CaptureArgs {
    /// Where to write the PNG (defaults to the configured output directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Region to blank out, as x,y,width,height (repeatable)
    #[arg(short, long, value_name = "X,Y,W,H")]
    exclude: Vec<Region>,

    /// Test pattern width in pixels
    #[arg(long, default_value = "640")]
    width: u32,

    /// Test pattern height in pixels
    #[arg(long, default_value = "360")]
    height: u32,

    /// Give up after this many milliseconds (overrides the config file)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Suppress diagnostic logging for this run
    #[arg(short, long)]
    quiet: bool,

    /// Print the listener events and the outcome as JSON
    #[arg(long)]
    json: bool,
}

/// Capture the test-pattern surface
pub async fn capture(args: CaptureArgs) -> Result<()> {
    if args.width == 0 || args.height == 0 {
        bail!("Test pattern dimensions must be non-zero");
    }

    let mut config = ConfigFile::load_or_default().into_config();
    if let Some(ms) = args.timeout_ms {
        config.capture_timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }
    if args.quiet {
        config.logging = false;
    }
    for problem in config.validate() {
        eprintln!("warning: {}", problem);
    }
    configure(&config);

    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(SnapshotProvider::default_output_dir);
    let cell = OrchestratorCell::new(config, move || {
        let provider: Arc<dyn CaptureProvider> = Arc::new(SnapshotProvider::new(&output_dir));
        provider
    });

    let surface: Arc<dyn Surface> = Arc::new(TestPattern::new(args.width, args.height));
    let orchestrator = cell
        .attach(&surface)
        .context("Failed to attach test-pattern surface")?;

    let events = if args.json {
        let (listener, rx) = ChannelListener::new();
        orchestrator.listener_handle().set(listener);
        Some(rx)
    } else {
        orchestrator.listener_handle().set(PrintListener);
        None
    };

    let request = CaptureRequest::new().with_exclusions(args.exclude);
    let request = match args.output {
        Some(path) => request.with_destination(path),
        None => request,
    };

    info!("Submitting {}", request.handle());
    let outcome = orchestrator.capture_async(request).outcome().await;

    if let Some(mut rx) = events {
        // The task resolves only after its terminal event was delivered
        let mut recorded = Vec::new();
        while let Ok(event) = rx.try_recv() {
            recorded.push(event);
        }
        println!("{}", serde_json::to_string_pretty(&json_report(&recorded, &outcome))?);
    }

    match outcome {
        CaptureOutcome::Success { .. } => Ok(()),
        CaptureOutcome::Failure { kind, message } => bail!("{} ({})", message, kind),
    }
}

/// JSON document printed by `--json`
fn json_report(events: &[CaptureEvent], outcome: &CaptureOutcome) -> Value {
    json!({
        "events": events,
        "outcome": outcome,
    })
}

/// Prints capture events as they arrive
struct PrintListener;

impl CaptureListener for PrintListener {
    fn on_capture_started(&self, handle: Handle) {
        println!("Capturing ({})...", handle);
    }

    fn on_capture_complete(&self, _handle: Handle, artifact: &Path) {
        println!("Saved {}", artifact.display());
    }

    fn on_capture_failed(&self, _handle: Handle, error: &ShutterError) {
        eprintln!("Capture failed: {}", error);
        if let Some(hint) = error.user_hint() {
            eprintln!("  hint: {}", hint);
        }
    }
}

/// Synthetic surface rendering a color gradient
struct TestPattern {
    width: u32,
    height: u32,
}

impl TestPattern {
    fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Surface for TestPattern {
    fn id(&self) -> String {
        format!("test-pattern-{}x{}", self.width, self.height)
    }

    fn is_alive(&self) -> bool {
        true
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render(&self) -> shutter_core::Result<Frame> {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                let r = ((x as f32 / self.width as f32) * 255.0) as u8;
                let g = ((y as f32 / self.height as f32) * 255.0) as u8;
                let b = (((x + y) as f32 / (self.width + self.height) as f32) * 255.0) as u8;
                data.extend_from_slice(&[r, g, b, 255]);
            }
        }
        Frame::new(self.width, self.height, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shutter_core::ErrorKind;

    #[test]
    fn test_json_report_lists_events_then_outcome() {
        let handle = Handle::new();
        let events = vec![
            CaptureEvent::Started { handle },
            CaptureEvent::Failed {
                handle,
                kind: ErrorKind::CaptureFailed,
                message: "Capture failed: boom".to_string(),
            },
        ];
        let outcome = CaptureOutcome::Failure {
            kind: ErrorKind::CaptureFailed,
            message: "Capture failed: boom".to_string(),
        };

        let report = json_report(&events, &outcome);

        let listed = report["events"].as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["event"], "started");
        assert_eq!(listed[1]["event"], "failed");
        assert_eq!(report["outcome"]["status"], "failure");

        let parsed: Vec<CaptureEvent> = serde_json::from_value(report["events"].clone()).unwrap();
        assert_eq!(parsed, events);
    }

    #[tokio::test]
    async fn test_test_pattern_capture_records_events() {
        let dir = std::env::temp_dir().join(format!("shutter-cli-test-{}", Handle::new()));
        let cell = OrchestratorCell::new(Default::default(), {
            let dir = dir.clone();
            move || {
                let provider: Arc<dyn CaptureProvider> = Arc::new(SnapshotProvider::new(&dir));
                provider
            }
        });
        let surface: Arc<dyn Surface> = Arc::new(TestPattern::new(8, 4));
        let orchestrator = cell.attach(&surface).unwrap();

        let (listener, mut rx) = ChannelListener::new();
        orchestrator.listener_handle().set(listener);
        let outcome = orchestrator.capture_async(CaptureRequest::new()).outcome().await;

        let mut recorded = Vec::new();
        while let Ok(event) = rx.try_recv() {
            recorded.push(event);
        }
        let report = json_report(&recorded, &outcome);

        assert_eq!(report["outcome"]["status"], "success");
        assert_eq!(report["events"][0]["event"], "started");
        assert_eq!(report["events"][1]["event"], "completed");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
