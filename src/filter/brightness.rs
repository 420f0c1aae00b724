use crate::capture::Frame;
use crate::control::BrightnessLevel;
use crate::error::PipelineError;

type Lut = [u8; 256];

/// Per-level gain with zero offset, applied through lookup tables.
#[derive(Debug, Clone)]
pub struct Brightness {
    gains: [f32; 3],
    tables: [Lut; 3],
}

impl Brightness {
    /// `gains` are for levels 1, 2 and 3; level 0 is always identity.
    pub fn new(gains: [f32; 3]) -> Result<Self, PipelineError> {
        if let Some(bad) = gains.iter().find(|g| !g.is_finite() || **g < 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "brightness gain {bad} must be finite and non-negative"
            )));
        }
        Ok(Self {
            gains,
            tables: gains.map(build_table),
        })
    }

    pub fn gain(&self, level: BrightnessLevel) -> f32 {
        match level {
            BrightnessLevel::Off => 1.0,
            other => self.gains[other.level() as usize - 1],
        }
    }

    pub fn apply(&self, mut frame: Frame, level: BrightnessLevel) -> Frame {
        if level == BrightnessLevel::Off {
            return frame;
        }
        let table = &self.tables[level.level() as usize - 1];
        for value in frame.image.iter_mut() {
            *value = table[*value as usize];
        }
        frame
    }
}

/// Saturating `round(v * gain)` for every 8-bit input, halves to even.
fn build_table(gain: f32) -> Lut {
    let mut table = [0u8; 256];
    for (v, out) in table.iter_mut().enumerate() {
        *out = (v as f32 * gain).round_ties_even().min(255.0) as u8;
    }
    table
}
