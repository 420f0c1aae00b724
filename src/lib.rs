pub mod capture;
pub mod control;
pub mod display;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod record;
pub mod utils;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use capture::{Frame, PixelFormat};
pub use control::{Configuration, ConfigurationState, Control};
pub use error::PipelineError;
pub use filter::CropRect;
pub use pipeline::{Pipeline, RunSummary, StopReason};

/// Optional settings file looked up in the working directory (`framelab.toml`)
pub const CONFIG_FILE: &str = "framelab";

/// Static settings, fixed for the lifetime of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub filters: FilterConfig,
    pub record: RecordConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Device node; `None` picks the first available camera
    pub device: Option<String>,
    /// Requested size; `None` keeps the device's native size
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub video_title: String,
    pub controls_title: String,
    pub controls_width: u32,
    pub controls_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Every frame is resized to this before any other stage
    pub working_width: u32,
    pub working_height: u32,
    /// Gains for brightness levels 1, 2 and 3
    pub brightness_gains: [f32; 3],
    /// Odd Gaussian kernel size
    pub blur_kernel: usize,
    pub crop: CropRect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    pub path: PathBuf,
    pub fps: u32,
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            width: None,
            height: None,
            buffer_count: 4,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            video_title: "Video".into(),
            controls_title: "Configuration".into(),
            controls_width: 500,
            controls_height: 500,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            working_width: 1600,
            working_height: 900,
            brightness_gains: [1.8, 2.5, 3.0],
            blur_kernel: 25,
            crop: CropRect::new(240, 50, 250, 250),
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            path: "output.avi".into(),
            fps: 15,
            jpeg_quality: 90,
        }
    }
}

impl Config {
    /// Defaults, overlaid with `framelab.toml` when present.
    pub fn load() -> Result<Self, PipelineError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .build()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        let config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: &str| Err(PipelineError::InvalidConfig(msg.into()));

        if self.capture.buffer_count == 0 {
            return invalid("capture.buffer_count must be at least 1");
        }
        if self.record.fps == 0 {
            return invalid("record.fps must be at least 1");
        }
        if !(1..=100).contains(&self.record.jpeg_quality) {
            return invalid("record.jpeg_quality must be within 1..=100");
        }
        if self.display.controls_width == 0 || self.display.controls_height == 0 {
            return invalid("display control window must be non-empty");
        }
        // Filter settings are checked where the stages are built
        filter::FilterChain::new(&self.filters).map(|_| ())
    }
}
