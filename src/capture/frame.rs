use bytes::Bytes;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Decoded 3-channel 8-bit frame flowing through the filter chain.
///
/// Each stage takes the frame by value and hands back the one it produced,
/// so a retired buffer is never observed again.
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGB pixel data, row-major, tightly packed
    pub image: RgbImage,

    /// Frame metadata
    pub meta: FrameMetadata,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

/// Frame metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub device_timestamp: Option<Duration>, // Hardware timestamp if available
}

impl Frame {
    pub fn new(image: RgbImage, meta: FrameMetadata) -> Self {
        Self {
            image,
            meta,
            timestamp: Instant::now(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Replace the pixel buffer, keeping sequence and timing information.
    pub fn with_image(self, image: RgbImage) -> Self {
        Self { image, ..self }
    }
}

/// Undecoded buffer as dequeued from the device.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    /// Bytes per row for packed formats; ignored for MJPEG
    pub stride: u32,
    pub format: PixelFormat,
    pub meta: FrameMetadata,
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Yuyv4,
    Mjpeg,
}

impl PixelFormat {
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            PixelFormat::Rgb24 => *b"RGB3",
            PixelFormat::Bgr24 => *b"BGR3",
            PixelFormat::Yuyv4 => *b"YUYV",
            PixelFormat::Mjpeg => *b"MJPG",
        }
    }

    pub fn from_fourcc(repr: &[u8; 4]) -> Option<Self> {
        match repr {
            b"RGB3" => Some(PixelFormat::Rgb24),
            b"BGR3" => Some(PixelFormat::Bgr24),
            b"YUYV" => Some(PixelFormat::Yuyv4),
            b"MJPG" => Some(PixelFormat::Mjpeg),
            _ => None,
        }
    }

    /// Bytes per pixel for packed formats.
    pub fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => Some(3),
            PixelFormat::Yuyv4 => Some(2),
            PixelFormat::Mjpeg => None,
        }
    }
}
