//! Core types for Shutter
//!
//! Requests, outcomes and pixel data exchanged between the orchestrator,
//! capture providers and listeners.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ErrorKind, Result, ShutterError};

/// Global handle counter for unique capture IDs
static HANDLE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying one capture request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(u64);

impl Handle {
    /// Create a new unique handle
    pub fn new() -> Self {
        Self(HANDLE_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw handle value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "capture#{}", self.0)
    }
}

/// Axis-aligned rectangle in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Create a new region
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip this region to a `width` x `height` surface
    ///
    /// Returns `None` when nothing of the region lies on the surface.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        if self.x >= width || self.y >= height || self.width == 0 || self.height == 0 {
            return None;
        }
        let right = self.x.saturating_add(self.width).min(width);
        let bottom = self.y.saturating_add(self.height).min(height);
        Some(Region::new(self.x, self.y, right - self.x, bottom - self.y))
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    /// Parse `x,y,width,height`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("Expected x,y,width,height but got: {}", s));
        }

        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("Invalid region component '{}' in: {}", part, s))?;
        }

        Ok(Region::new(values[0], values[1], values[2], values[3]))
    }
}

/// A single capture request
///
/// Built with the `with_*` methods and then handed by value to the
/// orchestrator, so it cannot change after submission and maps to exactly
/// one pipeline run. Not `Clone`, so a handle never names two runs:
///
/// ```compile_fail
/// let request = shutter_core::CaptureRequest::new();
/// let copy = request.clone();
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct CaptureRequest {
    handle: Handle,
    destination: Option<PathBuf>,
    exclusions: Vec<Region>,
}

impl CaptureRequest {
    /// Capture to the provider's default location with nothing excluded
    pub fn new() -> Self {
        Self {
            handle: Handle::new(),
            destination: None,
            exclusions: Vec::new(),
        }
    }

    /// Write the artifact to an explicit location
    pub fn with_destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    /// Exclude one region from the capture
    pub fn exclude(mut self, region: Region) -> Self {
        self.exclusions.push(region);
        self
    }

    /// Exclude a set of regions from the capture
    pub fn with_exclusions(mut self, regions: impl IntoIterator<Item = Region>) -> Self {
        self.exclusions.extend(regions);
        self
    }

    /// Unique handle of this request
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Requested artifact location, if any
    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// Regions to leave out of the capture
    pub fn exclusions(&self) -> &[Region] {
        &self.exclusions
    }
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal result of one capture request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaptureOutcome {
    /// Artifact written to the given location
    Success { artifact: PathBuf },
    /// Capture did not produce an artifact
    Failure { kind: ErrorKind, message: String },
}

impl CaptureOutcome {
    /// Whether the capture succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Artifact location on success
    pub fn artifact(&self) -> Option<&Path> {
        match self {
            Self::Success { artifact } => Some(artifact),
            Self::Failure { .. } => None,
        }
    }
}

impl From<Result<PathBuf>> for CaptureOutcome {
    fn from(result: Result<PathBuf>) -> Self {
        match result {
            Ok(artifact) => Self::Success { artifact },
            Err(e) => Self::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

impl std::fmt::Display for CaptureOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success { artifact } => write!(f, "Success({})", artifact.display()),
            Self::Failure { kind, message } => write!(f, "Failure({}: {})", kind, message),
        }
    }
}

/// RGBA8 pixel buffer rendered by a surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA rows, `width * height * 4` bytes
    pub data: Vec<u8>,
}

impl Frame {
    /// Wrap RGBA data, checking that its length matches the dimensions
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ShutterError::capture_failed(format!(
                "Frame data is {} bytes, expected {} for {}x{} RGBA",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a frame filled with a single RGBA color
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            data,
        }
    }
}
