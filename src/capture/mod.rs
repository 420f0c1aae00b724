pub mod decoder;
pub mod frame;
pub mod v4l2;

pub use frame::Frame;
pub use frame::FrameMetadata;
pub use frame::PixelFormat;
pub use frame::RawFrame;
pub use v4l2::V4l2Capture;

/// Producer of decoded frames, one per pipeline tick.
pub trait FrameSource {
    /// Block until the next frame is available.
    ///
    /// Returns `None` at end of stream. A failed read also ends the stream;
    /// live capture cannot be replayed, so there is nothing to retry.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Width and height of frames as delivered by the device.
    fn native_geometry(&self) -> (u32, u32);
}
