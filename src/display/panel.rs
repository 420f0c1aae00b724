//! SDL2 "Configuration" window: one horizontal range control per setting.

use sdl2::pixels::Color;
use sdl2::rect::Rect;
use sdl2::render::Canvas;
use sdl2::video::Window;
use sdl2::VideoSubsystem;

use crate::control::{Configuration, Control};
use crate::error::PipelineError;

const MARGIN: i32 = 32;
const TRACK_HEIGHT: u32 = 12;
const KNOB_WIDTH: u32 = 16;
const KNOB_HEIGHT: u32 = 28;

const BACKGROUND: Color = Color::RGB(40, 40, 44);
const TRACK: Color = Color::RGB(90, 90, 96);
const FILL: Color = Color::RGB(70, 140, 220);
const KNOB: Color = Color::RGB(230, 230, 230);

/// Track geometry in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Splits the panel into one row per [`Control`], top to bottom.
#[derive(Debug, Clone, Copy)]
pub struct PanelLayout {
    pub width: u32,
    pub height: u32,
}

impl PanelLayout {
    fn row_height(&self) -> u32 {
        (self.height / Control::ALL.len() as u32).max(1)
    }

    pub fn track(&self, row: usize) -> TrackRect {
        let row_height = self.row_height();
        let top = (row as u32 * row_height) as i32;
        TrackRect {
            x: MARGIN,
            y: top + (row_height.saturating_sub(TRACK_HEIGHT) / 2) as i32,
            width: self.width.saturating_sub(2 * MARGIN as u32).max(1),
            height: TRACK_HEIGHT,
        }
    }

    /// Control under `(x, y)` and the value that position selects.
    ///
    /// Positions past either end of a track yield out-of-range values, which
    /// the configuration clamps.
    pub fn hit(&self, x: i32, y: i32) -> Option<(Control, i64)> {
        if y < 0 {
            return None;
        }
        let row = (y as u32 / self.row_height()) as usize;
        let control = *Control::ALL.get(row)?;

        let track = self.track(row);
        let fraction = (x - track.x) as f64 / track.width as f64;
        let value = (fraction * control.max() as f64).round() as i64;
        Some((control, value))
    }

    /// Horizontal knob centre for `value` on `row`'s track.
    pub fn knob_x(&self, row: usize, value: u8, max: u8) -> i32 {
        let track = self.track(row);
        track.x + (track.width as f64 * value as f64 / max.max(1) as f64).round() as i32
    }
}

pub struct ControlPanel {
    canvas: Canvas<Window>,
    layout: PanelLayout,
    title: String,
    shown: Option<Configuration>,
}

impl ControlPanel {
    pub fn new(
        video: &VideoSubsystem,
        title: &str,
        width: u32,
        height: u32,
    ) -> Result<Self, PipelineError> {
        let window = video
            .window(title, width, height)
            .build()
            .map_err(|e| PipelineError::Display(e.to_string()))?;
        let canvas = window
            .into_canvas()
            .build()
            .map_err(|e| PipelineError::Display(e.to_string()))?;

        Ok(Self {
            canvas,
            layout: PanelLayout { width, height },
            title: title.to_string(),
            shown: None,
        })
    }

    pub fn window_id(&self) -> u32 {
        self.canvas.window().id()
    }

    pub fn layout(&self) -> PanelLayout {
        self.layout
    }

    /// Redraw if `settings` differ from what is on screen.
    pub fn refresh(&mut self, settings: &Configuration) -> Result<(), PipelineError> {
        if self.shown == Some(*settings) {
            return Ok(());
        }

        self.canvas.set_draw_color(BACKGROUND);
        self.canvas.clear();

        for (row, control) in Control::ALL.into_iter().enumerate() {
            let track = self.layout.track(row);
            let value = settings.value(control);
            let knob_x = self.layout.knob_x(row, value, control.max());

            self.canvas.set_draw_color(TRACK);
            self.canvas
                .fill_rect(Rect::new(track.x, track.y, track.width, track.height))
                .map_err(PipelineError::Display)?;

            let filled = (knob_x - track.x).max(0) as u32;
            if filled > 0 {
                self.canvas.set_draw_color(FILL);
                self.canvas
                    .fill_rect(Rect::new(track.x, track.y, filled, track.height))
                    .map_err(PipelineError::Display)?;
            }

            let knob_y = track.y + track.height as i32 / 2 - KNOB_HEIGHT as i32 / 2;
            self.canvas.set_draw_color(KNOB);
            self.canvas
                .fill_rect(Rect::new(
                    knob_x - KNOB_WIDTH as i32 / 2,
                    knob_y,
                    KNOB_WIDTH,
                    KNOB_HEIGHT,
                ))
                .map_err(PipelineError::Display)?;
        }
        self.canvas.present();

        // No font renderer; the title carries the labels and values
        let title = panel_title(&self.title, settings);
        self.canvas
            .window_mut()
            .set_title(&title)
            .map_err(|e| PipelineError::Display(e.to_string()))?;

        self.shown = Some(*settings);
        Ok(())
    }
}

pub fn panel_title(base: &str, settings: &Configuration) -> String {
    let values: Vec<String> = Control::ALL
        .iter()
        .map(|&c| format!("{}: {}", c.label(), settings.value(c)))
        .collect();
    format!("{} | {}", base, values.join("  "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: PanelLayout = PanelLayout {
        width: 500,
        height: 500,
    };

    #[test]
    fn rows_follow_control_order() {
        assert_eq!(LAYOUT.hit(250, 10).map(|h| h.0), Some(Control::Record));
        assert_eq!(LAYOUT.hit(250, 130).map(|h| h.0), Some(Control::Brightness));
        assert_eq!(LAYOUT.hit(250, 260).map(|h| h.0), Some(Control::GaussianBlur));
        assert_eq!(LAYOUT.hit(250, 499).map(|h| h.0), Some(Control::Cut));
        assert_eq!(LAYOUT.hit(250, 500), None);
        assert_eq!(LAYOUT.hit(250, -1), None);
    }

    #[test]
    fn horizontal_position_selects_value() {
        // Brightness track spans x = 32..468
        assert_eq!(LAYOUT.hit(32, 150), Some((Control::Brightness, 0)));
        assert_eq!(LAYOUT.hit(177, 150), Some((Control::Brightness, 1)));
        assert_eq!(LAYOUT.hit(323, 150), Some((Control::Brightness, 2)));
        assert_eq!(LAYOUT.hit(468, 150), Some((Control::Brightness, 3)));
        assert_eq!(LAYOUT.hit(0, 150), Some((Control::Brightness, 0)));
        assert_eq!(LAYOUT.hit(499, 150), Some((Control::Brightness, 3)));
        assert_eq!(LAYOUT.hit(100, 20), Some((Control::Record, 0)));
        assert_eq!(LAYOUT.hit(400, 20), Some((Control::Record, 1)));
    }

    #[test]
    fn knob_sits_on_track_ends() {
        let track = LAYOUT.track(1);
        assert_eq!(LAYOUT.knob_x(1, 0, 3), track.x);
        assert_eq!(LAYOUT.knob_x(1, 3, 3), track.x + track.width as i32);
    }

    #[test]
    fn title_lists_every_control() {
        let settings = Configuration::default()
            .with(Control::Brightness, 2)
            .with(Control::Cut, 1);
        assert_eq!(
            panel_title("Configuration", &settings),
            "Configuration | Record: 0  Brightness: 2  GaussianBlur: 0  Cut: 1"
        );
    }
}
