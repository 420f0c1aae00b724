use std::cell::RefCell;
use std::rc::Rc;

use framelab::capture::{Frame, FrameMetadata, FrameSource};
use framelab::display::{ControlSignal, ControlSurface, DisplaySink};
use framelab::filter::FilterChain;
use framelab::record::{AviWriter, Codec, RecordSink, StreamGeometry, VideoWriter};
use framelab::{
    Config, ConfigurationState, Control, Pipeline, PipelineError, StopReason,
};
use image::{Rgb, RgbImage};

/// Synthetic camera: `frames` uniform frames, or end of stream early at `end_at`.
struct SyntheticCamera {
    width: u32,
    height: u32,
    value: u8,
    produced: u64,
    frames: u64,
    end_at: Option<u64>,
}

impl SyntheticCamera {
    fn new(width: u32, height: u32, value: u8, frames: u64) -> Self {
        Self {
            width,
            height,
            value,
            produced: 0,
            frames,
            end_at: None,
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn next_frame(&mut self) -> Option<Frame> {
        let next = self.produced + 1;
        if next > self.frames || self.end_at == Some(next) {
            return None;
        }
        self.produced = next;
        Some(Frame::new(
            RgbImage::from_pixel(self.width, self.height, Rgb([self.value; 3])),
            FrameMetadata {
                sequence: next,
                device_timestamp: None,
            },
        ))
    }

    fn native_geometry(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Display that discards frames and never cancels.
struct Headless;

impl DisplaySink for Headless {
    fn show(&mut self, _frame: &Frame) -> Result<(), PipelineError> {
        Ok(())
    }
}

impl ControlSurface for Headless {
    fn poll(&mut self) -> ControlSignal {
        ControlSignal::Continue
    }
}

#[derive(Clone, Default)]
struct CapturingWriter {
    frames: Rc<RefCell<Vec<RgbImage>>>,
}

impl VideoWriter for CapturingWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        self.frames.borrow_mut().push(frame.image.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}

fn run_with(
    camera: SyntheticCamera,
    controls: ConfigurationState,
    writer: CapturingWriter,
) -> framelab::RunSummary {
    let config = Config::default();
    let (width, height) = camera.native_geometry();
    let geometry = StreamGeometry::new(width, height, config.record.fps, Codec::Mjpeg);
    let recorder = RecordSink::new(writer, geometry);
    let filters = FilterChain::new(&config.filters).unwrap();

    Pipeline::new(camera, Headless, recorder, filters, controls)
        .run()
        .unwrap()
}

#[test]
fn brightened_frames_are_recorded_at_native_size() {
    let controls = ConfigurationState::new();
    controls.set(Control::Record, 1);
    controls.set(Control::Brightness, 2);

    let writer = CapturingWriter::default();
    let summary = run_with(
        SyntheticCamera::new(640, 480, 40, 10),
        controls,
        writer.clone(),
    );

    assert_eq!(summary.stop_reason, StopReason::EndOfStream);
    assert_eq!(summary.frames_recorded, 10);

    let frames = writer.frames.borrow();
    assert_eq!(frames.len(), 10);
    for frame in frames.iter() {
        assert_eq!(frame.dimensions(), (640, 480));
        // 40 * 2.5
        assert!(frame.pixels().all(|p| *p == Rgb([100, 100, 100])));
    }
}

#[test]
fn end_of_stream_on_fifth_frame_records_four() {
    let controls = ConfigurationState::new();
    controls.set(Control::Record, 1);

    let mut camera = SyntheticCamera::new(640, 480, 40, 10);
    camera.end_at = Some(5);

    let writer = CapturingWriter::default();
    let summary = run_with(camera, controls, writer.clone());

    assert_eq!(summary.stop_reason, StopReason::EndOfStream);
    assert_eq!(summary.ticks, 4);
    assert_eq!(writer.frames.borrow().len(), 4);
}

#[test]
fn cropped_recording_keeps_stream_geometry() {
    let controls = ConfigurationState::new();
    controls.set(Control::Record, 1);
    controls.set(Control::Cut, 1);

    let writer = CapturingWriter::default();
    run_with(
        SyntheticCamera::new(320, 240, 90, 3),
        controls,
        writer.clone(),
    );

    let frames = writer.frames.borrow();
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.dimensions() == (320, 240)));
}

#[test]
fn record_off_writes_nothing_to_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.avi");
    let config = Config::default();
    let geometry = StreamGeometry::new(160, 120, config.record.fps, Codec::Mjpeg);

    let writer = AviWriter::create(&path, geometry, config.record.jpeg_quality).unwrap();
    let summary = Pipeline::new(
        SyntheticCamera::new(160, 120, 10, 5),
        Headless,
        RecordSink::new(writer, geometry),
        FilterChain::new(&config.filters).unwrap(),
        ConfigurationState::new(),
    )
    .run()
    .unwrap();

    assert_eq!(summary.ticks, 5);
    assert_eq!(summary.frames_recorded, 0);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
    // Header plus an empty index, nothing in between
    assert_eq!(bytes.len(), 224 + 8);
    assert_eq!(u32::from_le_bytes(bytes[48..52].try_into().unwrap()), 0);
}

#[test]
fn recording_to_avi_counts_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.avi");
    let config = Config::default();
    let geometry = StreamGeometry::new(160, 120, config.record.fps, Codec::Mjpeg);

    let controls = ConfigurationState::new();
    controls.set(Control::Record, 1);
    controls.set(Control::Cut, 1);

    let writer = AviWriter::create(&path, geometry, config.record.jpeg_quality).unwrap();
    let summary = Pipeline::new(
        SyntheticCamera::new(160, 120, 10, 4),
        Headless,
        RecordSink::new(writer, geometry),
        FilterChain::new(&config.filters).unwrap(),
        controls,
    )
    .run()
    .unwrap();
    assert_eq!(summary.frames_recorded, 4);

    let bytes = std::fs::read(&path).unwrap();
    let u32_at = |at: usize| u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
    assert_eq!(u32_at(4) as usize, bytes.len() - 8);
    assert_eq!(u32_at(48), 4);
    assert_eq!((u32_at(64), u32_at(68)), (160, 120));

    let index = 220 + u32_at(216) as usize;
    assert_eq!(&bytes[index..index + 4], b"idx1");
    assert_eq!(u32_at(index + 4), 4 * 16);
}
