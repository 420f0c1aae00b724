pub mod panel;
pub mod video;

pub use panel::ControlPanel;
pub use video::VideoWindow;

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::mouse::MouseButton;
use sdl2::{EventPump, Sdl};
use tracing::{debug, info, warn};

use crate::capture::Frame;
use crate::control::{Configuration, ConfigurationState, Control};
use crate::error::PipelineError;
use crate::DisplayConfig;

/// Renders filtered frames for a human to look at.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame) -> Result<(), PipelineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Continue,
    Cancel,
}

/// Source of configuration changes and of the stop request.
pub trait ControlSurface {
    /// Drain pending user input. Called once per tick, after display.
    fn poll(&mut self) -> ControlSignal;
}

/// Both windows plus the event pump that feeds them.
pub struct SdlFrontend {
    video: VideoWindow,
    panel: ControlPanel,
    event_pump: EventPump,
    controls: ConfigurationState,
    dragging: bool,
    _context: Sdl,
}

impl SdlFrontend {
    pub fn new(
        config: &DisplayConfig,
        initial_size: (u32, u32),
        controls: ConfigurationState,
    ) -> Result<Self, PipelineError> {
        // Ctrl-C keeps its default meaning instead of becoming a quit event
        sdl2::hint::set("SDL_NO_SIGNAL_HANDLERS", "1");
        let context = sdl2::init().map_err(PipelineError::Display)?;
        let subsystem = context.video().map_err(PipelineError::Display)?;

        let video = VideoWindow::new(
            &subsystem,
            &config.video_title,
            initial_size.0,
            initial_size.1,
        )?;
        let mut panel = ControlPanel::new(
            &subsystem,
            &config.controls_title,
            config.controls_width,
            config.controls_height,
        )?;
        panel.refresh(&controls.snapshot())?;

        let event_pump = context.event_pump().map_err(PipelineError::Display)?;

        info!("Display ready");
        Ok(Self {
            video,
            panel,
            event_pump,
            controls,
            dragging: false,
            _context: context,
        })
    }

    fn select(&self, x: i32, y: i32) {
        if let Some((control, value)) = self.panel.layout().hit(x, y) {
            self.controls.set(control, value);
        }
    }
}

impl DisplaySink for SdlFrontend {
    fn show(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        self.video.render_frame(frame)
    }
}

impl ControlSurface for SdlFrontend {
    fn poll(&mut self) -> ControlSignal {
        let events: Vec<Event> = self.event_pump.poll_iter().collect();
        let panel_id = self.panel.window_id();
        let mut signal = ControlSignal::Continue;

        for event in events {
            if is_cancel(&event) {
                info!("Stop requested");
                signal = ControlSignal::Cancel;
                continue;
            }
            match event {
                Event::Quit { .. } => {
                    debug!("Quit event ignored, press ESC to stop");
                }
                Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => {
                    if let Some((control, value)) = shortcut(key, &self.controls.snapshot()) {
                        self.controls.set(control, value);
                    }
                }
                Event::MouseButtonDown {
                    window_id,
                    mouse_btn: MouseButton::Left,
                    x,
                    y,
                    ..
                } if window_id == panel_id => {
                    self.dragging = true;
                    self.select(x, y);
                }
                Event::MouseMotion {
                    window_id, x, y, ..
                } if window_id == panel_id && self.dragging => {
                    self.select(x, y);
                }
                Event::MouseButtonUp {
                    mouse_btn: MouseButton::Left,
                    ..
                } => {
                    self.dragging = false;
                }
                _ => {}
            }
        }

        if let Err(e) = self.panel.refresh(&self.controls.snapshot()) {
            warn!("Control panel redraw failed: {}", e);
        }
        signal
    }
}

/// ESC in either window is the only way to stop the loop.
fn is_cancel(event: &Event) -> bool {
    matches!(
        event,
        Event::KeyDown {
            keycode: Some(Keycode::Escape),
            ..
        }
    )
}

/// Keyboard equivalents for the range controls.
fn shortcut(key: Keycode, current: &Configuration) -> Option<(Control, i64)> {
    let toggle = |control: Control| (control, 1 - current.value(control) as i64);
    match key {
        Keycode::R => Some(toggle(Control::Record)),
        Keycode::G => Some(toggle(Control::GaussianBlur)),
        Keycode::C => Some(toggle(Control::Cut)),
        Keycode::B => {
            let next = (current.value(Control::Brightness) + 1) % (Control::Brightness.max() + 1);
            Some((Control::Brightness, next as i64))
        }
        _ => None,
    }
}
