//! framelab: live camera view with adjustable filters and MJPEG recording

use color_eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use framelab::capture::{FrameSource, V4l2Capture};
use framelab::display::SdlFrontend;
use framelab::filter::FilterChain;
use framelab::record::{AviWriter, Codec, RecordSink, StreamGeometry};
use framelab::utils::{self, FoundDevice};
use framelab::{Config, ConfigurationState, Pipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("framelab=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("framelab launching...");

    // Load configuration
    let config = Config::load()?;

    // Everything fallible at startup happens before a window appears
    let device = match &config.capture.device {
        Some(path) => FoundDevice::probe(path)?,
        None => utils::auto_detect_device().await?,
    };
    info!("Using capture device: {:?}", device);

    let source = V4l2Capture::open(&config.capture, &device)?;
    let (width, height) = source.native_geometry();
    if let Some(fps) = source.native_fps() {
        info!("Device reports {} fps", fps);
    }

    let filters = FilterChain::new(&config.filters)?;

    let geometry = StreamGeometry::new(width, height, config.record.fps, Codec::Mjpeg);
    let writer = AviWriter::create(&config.record.path, geometry, config.record.jpeg_quality)?;
    let recorder = RecordSink::new(writer, geometry);

    let controls = ConfigurationState::new();
    let frontend = SdlFrontend::new(
        &config.display,
        (config.filters.working_width, config.filters.working_height),
        controls.clone(),
    )?;

    let summary = Pipeline::new(source, frontend, recorder, filters, controls).run()?;

    info!(
        "framelab shutting down: {} ticks, {} frames in {}",
        summary.ticks,
        summary.frames_recorded,
        config.record.path.display()
    );
    Ok(())
}
