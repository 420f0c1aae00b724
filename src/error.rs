use std::path::PathBuf;

use thiserror::Error;

use crate::capture::PixelFormat;

/// Failures surfaced by the capture/filter/record pipeline.
///
/// End of stream is not an error: a source reports it by returning `None`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("failed to decode {format:?} frame: {reason}")]
    Decode { format: PixelFormat, reason: String },

    #[error("display failure: {0}")]
    Display(String),

    #[error("failed to open output stream {}: {source}", path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output stream write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("output stream exceeds the 4 GiB AVI limit")]
    StreamTooLarge,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
