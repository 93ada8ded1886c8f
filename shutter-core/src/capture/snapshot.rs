//! PNG snapshot provider
//!
//! Asks the surface to render itself, blanks out excluded regions and
//! writes the result as a PNG. Rendering and encoding run on Tokio's
//! blocking pool so the orchestrator's caller is never stalled.

use image::{ImageFormat, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use super::provider::{CaptureFuture, CaptureProvider};
use crate::error::{Result, ShutterError};
use crate::surface::Surface;
use crate::types::{CaptureRequest, Frame, Handle, Region};

/// Pixel value written over excluded regions
const MASK: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Renders a surface to a PNG file
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    /// Directory used when a request has no destination
    output_dir: PathBuf,
}

impl SnapshotProvider {
    /// Create a provider writing unnamed captures into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory used when a request has no destination
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Default location for unnamed captures
    ///
    /// `~/Pictures/Screenshots` when a pictures directory exists, otherwise
    /// a `shutter` directory under the system temp dir.
    pub fn default_output_dir() -> PathBuf {
        if let Some(pictures) = dirs::picture_dir() {
            pictures.join("Screenshots")
        } else {
            std::env::temp_dir().join("shutter")
        }
    }

    /// Artifact path for a request without an explicit destination
    pub fn default_artifact_path(&self, handle: Handle) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.output_dir
            .join(format!("shutter-{}-{}.png", millis, handle.as_u64()))
    }
}

impl Default for SnapshotProvider {
    fn default() -> Self {
        Self::new(Self::default_output_dir())
    }
}

impl CaptureProvider for SnapshotProvider {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn capture(&self, surface: Arc<dyn Surface>, request: CaptureRequest) -> CaptureFuture {
        let provider = self.clone();

        Box::pin(async move {
            let path = match request.destination() {
                Some(path) => path.to_path_buf(),
                None => provider.default_artifact_path(request.handle()),
            };

            tokio::task::spawn_blocking(move || -> Result<PathBuf> {
                write_snapshot(surface.as_ref(), request.exclusions(), &path)?;
                Ok(path)
            })
            .await
            .map_err(|e| ShutterError::capture_failed(format!("Snapshot worker failed: {}", e)))?
        })
    }
}

/// Render `surface`, mask `exclusions` and write a PNG to `path`
pub fn write_snapshot(surface: &dyn Surface, exclusions: &[Region], path: &Path) -> Result<()> {
    // The orchestrator validated the surface earlier; it may have gone away since
    if !surface.is_alive() {
        return Err(ShutterError::capture_failed(format!(
            "Surface {} was torn down before rendering",
            surface.id()
        )));
    }

    let frame = surface.render()?;
    let expected = surface.size();
    if expected != (0, 0) && expected != (frame.width, frame.height) {
        return Err(ShutterError::capture_failed(format!(
            "Surface {} rendered a {}x{} frame but reports {}x{}",
            surface.id(),
            frame.width,
            frame.height,
            expected.0,
            expected.1
        )));
    }
    debug!(
        "Rendered surface {} at {}x{}",
        surface.id(),
        frame.width,
        frame.height
    );

    let mut image = frame_to_image(frame)?;
    for region in exclusions {
        mask_region(&mut image, region);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save_with_format(path, ImageFormat::Png)?;
    info!("Snapshot written to {:?}", path);

    Ok(())
}

fn frame_to_image(frame: Frame) -> Result<RgbaImage> {
    let (width, height) = (frame.width, frame.height);
    RgbaImage::from_raw(width, height, frame.data).ok_or_else(|| {
        ShutterError::capture_failed(format!("Frame buffer does not match {}x{}", width, height))
    })
}

fn mask_region(image: &mut RgbaImage, region: &Region) {
    let Some(clipped) = region.clamp_to(image.width(), image.height()) else {
        debug!("Excluded region {} lies outside the surface", region);
        return;
    };

    for y in clipped.y..clipped.y + clipped.height {
        for x in clipped.x..clipped.x + clipped.width {
            image.put_pixel(x, y, MASK);
        }
    }
}
