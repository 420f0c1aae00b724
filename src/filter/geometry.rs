use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capture::Frame;

/// Scale `frame` to exactly `width`x`height`.
///
/// Frames already at the target size pass through untouched, which makes
/// normalizing idempotent.
pub fn resize(frame: Frame, width: u32, height: u32) -> Frame {
    if frame.dimensions() == (width, height) {
        return frame;
    }
    let image = imageops::resize(&frame.image, width, height, FilterType::Triangle);
    frame.with_image(image)
}

/// Fixed rectangular region cut out of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersection with a `width`x`height` frame, or `None` if they don't overlap.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<CropRect> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        (w > 0 && h > 0).then_some(CropRect::new(self.x, self.y, w, h))
    }
}

/// Cut `rect` out of `frame`.
///
/// A region reaching past the frame edge is clipped to the frame. A region
/// entirely outside leaves the frame unchanged.
pub fn crop(frame: Frame, rect: CropRect) -> Frame {
    let (width, height) = frame.dimensions();
    let Some(region) = rect.clamp_to(width, height) else {
        debug!(?rect, width, height, "crop region outside frame, skipping");
        return frame;
    };
    if region != rect {
        debug!(?rect, ?region, "crop region clipped to frame bounds");
    }

    let image = imageops::crop_imm(&frame.image, region.x, region.y, region.width, region.height)
        .to_image();
    frame.with_image(image)
}
