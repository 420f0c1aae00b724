use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use v4l::{capability::Flags, video::Capture, Device};

use crate::capture::frame::PixelFormat;
use crate::error::PipelineError;

/// Number of `/dev/videoN` nodes scanned when no device is configured
const MAX_DEVICE_INDEX: u32 = 10;

// Detected capture device info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundDevice {
    pub path: String,
    pub format: PixelFormat,
}

impl FoundDevice {
    pub fn new(path: String, format: PixelFormat) -> Self {
        Self { path, format }
    }

    /// Probe an explicitly configured device node.
    pub fn probe(path: &str) -> Result<Self, PipelineError> {
        probe_device(path).ok_or_else(|| {
            PipelineError::DeviceUnavailable(format!(
                "{path} is not a capture device with MJPG or YUYV output"
            ))
        })
    }
}

/// Pick the first available capture device
pub async fn auto_detect_device() -> Result<FoundDevice, PipelineError> {
    info!("Auto-detecting capture devices...");

    for i in 0..MAX_DEVICE_INDEX {
        let path = format!("/dev/video{}", i);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            continue;
        }

        if let Some(found) = probe_device(&path) {
            return Ok(found);
        }
    }

    Err(PipelineError::DeviceUnavailable(
        "no capture device found".into(),
    ))
}

fn probe_device(path: impl AsRef<Path>) -> Option<FoundDevice> {
    let path = path.as_ref();
    let dev = Device::with_path(path).ok()?;
    let caps = dev.query_caps().ok()?;

    // Metadata nodes share the driver but can't capture
    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        debug!("Skipping {}: no video capture capability", path.display());
        return None;
    }

    let formats: Vec<PixelFormat> = dev
        .enum_formats()
        .ok()?
        .iter()
        .filter_map(|fmt| PixelFormat::from_fourcc(&fmt.fourcc.repr))
        .collect();

    let format = preferred_format(&formats)?;
    info!("Found {:?} device: {} - {}", format, path.display(), caps.card);
    Some(FoundDevice::new(path.display().to_string(), format))
}

/// Prefer MJPEG, fall back to YUYV
fn preferred_format(available: &[PixelFormat]) -> Option<PixelFormat> {
    [PixelFormat::Mjpeg, PixelFormat::Yuyv4]
        .into_iter()
        .find(|wanted| available.contains(wanted))
}
