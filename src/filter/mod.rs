//! Per-tick filter chain: normalize, brightness, blur, crop, in that order.

pub mod blur;
pub mod brightness;
pub mod geometry;

pub use blur::GaussianBlur;
pub use brightness::Brightness;
pub use geometry::{crop, resize, CropRect};

use tracing::trace;

use crate::capture::Frame;
use crate::control::Configuration;
use crate::error::PipelineError;
use crate::FilterConfig;

pub struct FilterChain {
    working_width: u32,
    working_height: u32,
    brightness: Brightness,
    blur: GaussianBlur,
    crop: CropRect,
}

impl FilterChain {
    pub fn new(config: &FilterConfig) -> Result<Self, PipelineError> {
        if config.working_width == 0 || config.working_height == 0 {
            return Err(PipelineError::InvalidConfig(
                "working resolution must be non-zero".into(),
            ));
        }
        if config.crop.width == 0 || config.crop.height == 0 {
            return Err(PipelineError::InvalidConfig(
                "crop region must be non-empty".into(),
            ));
        }

        Ok(Self {
            working_width: config.working_width,
            working_height: config.working_height,
            brightness: Brightness::new(config.brightness_gains)?,
            blur: GaussianBlur::new(config.blur_kernel)?,
            crop: config.crop,
        })
    }

    /// Run every stage enabled in `settings` over `frame`.
    ///
    /// Crop comes last, so it cuts already-processed pixels and the frame
    /// leaves the chain at the crop size.
    pub fn apply(&self, frame: Frame, settings: &Configuration) -> Frame {
        trace!(sequence = frame.meta.sequence, ?settings, "filtering frame");

        let frame = resize(frame, self.working_width, self.working_height);
        let frame = self.brightness.apply(frame, settings.brightness);
        let frame = if settings.blur {
            self.blur.apply(frame)
        } else {
            frame
        };

        if settings.crop {
            crop(frame, self.crop)
        } else {
            frame
        }
    }
}
