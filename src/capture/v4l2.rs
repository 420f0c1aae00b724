//! V4L2 frame source with memory-mapped buffers

use std::time::Duration;

use bytes::Bytes;
use tracing::{info, instrument, warn};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::{
    capture::{
        decoder,
        frame::{Frame, FrameMetadata, PixelFormat, RawFrame},
        FrameSource,
    },
    error::PipelineError,
    utils::FoundDevice,
    CaptureConfig,
};

/// Capture from a V4L2 device at its native rate
pub struct V4l2Capture {
    _device: Device,
    stream: MmapStream<'static>,
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
    fps: Option<u32>,
    sequence: u64,
}

impl V4l2Capture {
    /// Open the device and start streaming.
    ///
    /// Any failure here is reported as [`PipelineError::DeviceUnavailable`].
    #[instrument(skip(config))]
    pub fn open(config: &CaptureConfig, device: &FoundDevice) -> Result<Self, PipelineError> {
        let unavailable =
            |e: std::io::Error| PipelineError::DeviceUnavailable(format!("{}: {}", device.path, e));

        let dev = Device::with_path(&device.path).map_err(unavailable)?;

        let caps = dev.query_caps().map_err(unavailable)?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(PipelineError::DeviceUnavailable(format!(
                "{} doesn't support video capture",
                device.path
            )));
        }

        // Keep the device's native size unless one was configured
        let mut fmt = dev.format().map_err(unavailable)?;
        if let Some(width) = config.width {
            fmt.width = width;
        }
        if let Some(height) = config.height {
            fmt.height = height;
        }
        fmt.fourcc = FourCC::new(&device.format.fourcc());

        // The driver may adjust what we asked for; trust what it grants
        let fmt = dev.set_format(&fmt).map_err(unavailable)?;
        let format = PixelFormat::from_fourcc(&fmt.fourcc.repr).ok_or_else(|| {
            PipelineError::DeviceUnavailable(format!(
                "{} granted unsupported format {}",
                device.path, fmt.fourcc
            ))
        })?;

        let fps = dev
            .params()
            .ok()
            .filter(|p| p.interval.numerator > 0)
            .map(|p| p.interval.denominator / p.interval.numerator);

        let stream = MmapStream::with_buffers(&dev, Type::VideoCapture, config.buffer_count)
            .map_err(unavailable)?;

        info!(
            "Capture stream started: {}x{} {:?} @ {:?} fps, {} buffers",
            fmt.width, fmt.height, format, fps, config.buffer_count
        );

        Ok(Self {
            _device: dev,
            stream,
            width: fmt.width,
            height: fmt.height,
            stride: fmt.stride,
            format,
            fps,
            sequence: 0,
        })
    }

    /// Frame rate reported by the driver, if any
    pub fn native_fps(&self) -> Option<u32> {
        self.fps
    }

    /// Dequeue one buffer without decoding it
    #[instrument(skip(self))]
    pub fn capture_raw(&mut self) -> std::io::Result<RawFrame> {
        let (buf, meta) = self.stream.next()?;

        // Some drivers leave bytesused at zero for mmap buffers
        let used = match meta.bytesused as usize {
            0 => buf.len(),
            n => n.min(buf.len()),
        };
        let data = Bytes::copy_from_slice(&buf[..used]);

        self.sequence += 1;

        Ok(RawFrame {
            data,
            width: self.width,
            height: self.height,
            stride: self.stride,
            format: self.format,
            meta: FrameMetadata {
                sequence: self.sequence,
                device_timestamp: Some(
                    Duration::from_secs(meta.timestamp.sec as u64)
                        + Duration::from_micros(meta.timestamp.usec as u64),
                ),
            },
        })
    }
}

impl FrameSource for V4l2Capture {
    fn next_frame(&mut self) -> Option<Frame> {
        let raw = match self.capture_raw() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Capture read failed, ending stream: {}", e);
                return None;
            }
        };

        match decoder::decode_frame(&raw) {
            Ok(image) => Some(Frame::new(image, raw.meta)),
            Err(e) => {
                warn!("Frame {} undecodable, ending stream: {}", raw.meta.sequence, e);
                None
            }
        }
    }

    fn native_geometry(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
