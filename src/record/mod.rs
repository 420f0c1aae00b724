//! Conditional recording of filtered frames into a fixed-geometry stream.

pub mod avi;

pub use avi::{AviWriter, OutputStream};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capture::Frame;
use crate::error::PipelineError;
use crate::filter::resize;

/// Codecs the output stream can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Codec {
    /// Motion JPEG: every frame an independent JPEG image
    Mjpeg,
}

impl Codec {
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            Codec::Mjpeg => *b"MJPG",
        }
    }
}

/// Geometry negotiated once when the output stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGeometry {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: Codec,
}

impl StreamGeometry {
    pub fn new(width: u32, height: u32, fps: u32, codec: Codec) -> Self {
        Self {
            width,
            height,
            fps,
            codec,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Encoder + container for an output stream.
///
/// Callers only hand over frames matching the stream geometry.
pub trait VideoWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), PipelineError>;

    /// Flush and close the stream. Further writes are invalid.
    fn finish(&mut self) -> Result<(), PipelineError>;
}

/// Appends frames to the output stream, resizing any whose dimensions
/// differ from the stream geometry.
pub struct RecordSink<W: VideoWriter> {
    writer: W,
    geometry: StreamGeometry,
    frames_written: u64,
}

impl<W: VideoWriter> RecordSink<W> {
    pub fn new(writer: W, geometry: StreamGeometry) -> Self {
        info!(
            "Record sink open: {}x{} @ {} fps ({:?})",
            geometry.width, geometry.height, geometry.fps, geometry.codec
        );
        Self {
            writer,
            geometry,
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn write(&mut self, frame: Frame) -> Result<(), PipelineError> {
        let (width, height) = self.geometry.dimensions();
        let frame = if frame.dimensions() != (width, height) {
            debug!(
                from = ?frame.dimensions(),
                to = ?(width, height),
                "resizing frame to stream geometry"
            );
            metrics::counter!("frames_resized_for_record").increment(1);
            resize(frame, width, height)
        } else {
            frame
        };

        self.writer.write_frame(&frame)?;
        self.frames_written += 1;
        metrics::counter!("frames_recorded").increment(1);
        Ok(())
    }

    /// Finish the stream and report how many frames went into it.
    pub fn close(mut self) -> Result<u64, PipelineError> {
        self.writer.finish()?;
        info!("Record sink closed after {} frames", self.frames_written);
        Ok(self.frames_written)
    }
}
