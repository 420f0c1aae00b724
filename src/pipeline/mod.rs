//! Tick loop tying source, filters, display and recorder together.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::capture::FrameSource;
use crate::control::ConfigurationState;
use crate::display::{ControlSignal, ControlSurface, DisplaySink};
use crate::error::PipelineError;
use crate::filter::FilterChain;
use crate::record::{RecordSink, VideoWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    Stopped,
}

/// Why the loop left [`PipelineState::Running`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Cancelled,
    WriteFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub frames_recorded: u64,
    pub stop_reason: StopReason,
}

/// Owns every resource handle for one capture session.
///
/// Ticks run strictly one after another; the only outside influence is the
/// shared [`ConfigurationState`], read once per tick.
pub struct Pipeline<S, F, W>
where
    S: FrameSource,
    F: DisplaySink + ControlSurface,
    W: VideoWriter,
{
    source: S,
    frontend: F,
    recorder: RecordSink<W>,
    filters: FilterChain,
    controls: ConfigurationState,
    state: PipelineState,
    ticks: u64,
}

impl<S, F, W> Pipeline<S, F, W>
where
    S: FrameSource,
    F: DisplaySink + ControlSurface,
    W: VideoWriter,
{
    pub fn new(
        source: S,
        frontend: F,
        recorder: RecordSink<W>,
        filters: FilterChain,
        controls: ConfigurationState,
    ) -> Self {
        Self {
            source,
            frontend,
            recorder,
            filters,
            controls,
            state: PipelineState::Running,
            ticks: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Tick until the stream ends, the user cancels, or a write fails, then
    /// release everything.
    ///
    /// A display failure is returned as an error, after the recorder has
    /// been closed.
    pub fn run(mut self) -> Result<RunSummary, PipelineError> {
        info!("Pipeline running");

        let mut outcome = Ok(StopReason::EndOfStream);
        while self.state == PipelineState::Running {
            match self.tick() {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    outcome = Ok(reason);
                    self.state = PipelineState::Stopped;
                }
                Err(e) => {
                    outcome = Err(e);
                    self.state = PipelineState::Stopped;
                }
            }
        }

        let ticks = self.ticks;
        let frames_recorded = self.release();

        match outcome {
            Ok(stop_reason) => {
                info!(
                    "Pipeline stopped ({:?}) after {} ticks, {} frames recorded",
                    stop_reason, ticks, frames_recorded
                );
                Ok(RunSummary {
                    ticks,
                    frames_recorded,
                    stop_reason,
                })
            }
            Err(e) => {
                error!("Pipeline aborted after {} ticks: {}", ticks, e);
                Err(e)
            }
        }
    }

    /// One tick: read, snapshot, filter, show, maybe record, poll.
    ///
    /// `Ok(Some(_))` means the loop should stop.
    fn tick(&mut self) -> Result<Option<StopReason>, PipelineError> {
        let Some(frame) = self.source.next_frame() else {
            info!("End of stream");
            return Ok(Some(StopReason::EndOfStream));
        };
        let started = Instant::now();
        self.ticks += 1;
        metrics::counter!("frames_captured").increment(1);

        let settings = self.controls.snapshot();
        let frame = self.filters.apply(frame, &settings);

        self.frontend.show(&frame)?;

        if settings.record {
            if let Err(e) = self.recorder.write(frame) {
                warn!("Recording failed, stopping: {}", e);
                return Ok(Some(StopReason::WriteFailed));
            }
        }

        metrics::histogram!("tick_time_us").record(started.elapsed().as_micros() as f64);

        match self.frontend.poll() {
            ControlSignal::Cancel => Ok(Some(StopReason::Cancelled)),
            ControlSignal::Continue => Ok(None),
        }
    }

    /// Close the recorder, then drop source and display in that order.
    fn release(self) -> u64 {
        let Pipeline {
            source,
            frontend,
            recorder,
            ..
        } = self;

        let written = recorder.frames_written();
        let frames_recorded = match recorder.close() {
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to close output stream: {}", e);
                written
            }
        };

        drop(source);
        debug!("Frame source released");
        drop(frontend);
        debug!("Display released");

        frames_recorded
    }
}
