//! Runtime filter/record settings shared between the control surface and the
//! pipeline driver.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

/// One independently settable field, as exposed by a range control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Record,
    Brightness,
    GaussianBlur,
    Cut,
}

impl Control {
    /// Display order on the control surface
    pub const ALL: [Control; 4] = [
        Control::Record,
        Control::Brightness,
        Control::GaussianBlur,
        Control::Cut,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Control::Record => "Record",
            Control::Brightness => "Brightness",
            Control::GaussianBlur => "GaussianBlur",
            Control::Cut => "Cut",
        }
    }

    /// Upper bound of the control's range; the lower bound is always 0.
    pub fn max(self) -> u8 {
        match self {
            Control::Brightness => 3,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrightnessLevel {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

impl BrightnessLevel {
    /// Out-of-range levels saturate to the nearest bound.
    pub fn from_clamped(level: i64) -> Self {
        match level {
            i64::MIN..=0 => BrightnessLevel::Off,
            1 => BrightnessLevel::Low,
            2 => BrightnessLevel::Medium,
            _ => BrightnessLevel::High,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Snapshot of the settings a tick runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Configuration {
    pub record: bool,
    pub brightness: BrightnessLevel,
    pub blur: bool,
    pub crop: bool,
}

impl Configuration {
    /// Current value of `control` on its integer range.
    pub fn value(&self, control: Control) -> u8 {
        match control {
            Control::Record => self.record as u8,
            Control::Brightness => self.brightness.level(),
            Control::GaussianBlur => self.blur as u8,
            Control::Cut => self.crop as u8,
        }
    }

    /// Copy with `control` set to `value`, clamped into its range.
    pub fn with(mut self, control: Control, value: i64) -> Self {
        let toggle = value.clamp(0, 1) == 1;
        match control {
            Control::Record => self.record = toggle,
            Control::Brightness => self.brightness = BrightnessLevel::from_clamped(value),
            Control::GaussianBlur => self.blur = toggle,
            Control::Cut => self.crop = toggle,
        }
        self
    }
}

/// Handle to the live [`Configuration`].
///
/// Clones share the same state. Updates replace the whole record atomically,
/// so a snapshot never sees a half-written field.
#[derive(Debug, Clone)]
pub struct ConfigurationState {
    inner: Arc<ArcSwap<Configuration>>,
}

impl ConfigurationState {
    /// All fields start at 0 / off.
    pub fn new() -> Self {
        Self::with_initial(Configuration::default())
    }

    pub fn with_initial(initial: Configuration) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    pub fn set(&self, control: Control, value: i64) {
        let previous = self.inner.rcu(|current| current.with(control, value));
        debug!(
            control = control.label(),
            from = previous.value(control),
            requested = value,
            "configuration updated"
        );
    }

    pub fn snapshot(&self) -> Configuration {
        **self.inner.load()
    }
}

impl Default for ConfigurationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn starts_all_off() {
        let state = ConfigurationState::new();
        let snapshot = state.snapshot();
        for control in Control::ALL {
            assert_eq!(snapshot.value(control), 0, "{}", control.label());
        }
    }

    #[test]
    fn out_of_range_values_clamp() {
        let state = ConfigurationState::new();

        state.set(Control::Brightness, 9);
        assert_eq!(state.snapshot().brightness, BrightnessLevel::High);
        state.set(Control::Brightness, -4);
        assert_eq!(state.snapshot().brightness, BrightnessLevel::Off);

        state.set(Control::Record, 5);
        assert!(state.snapshot().record);
        state.set(Control::Record, -1);
        assert!(!state.snapshot().record);
    }

    #[test]
    fn fields_are_independent() {
        let state = ConfigurationState::new();
        state.set(Control::Cut, 1);
        state.set(Control::Brightness, 2);

        let snapshot = state.snapshot();
        assert!(snapshot.crop);
        assert!(!snapshot.blur);
        assert!(!snapshot.record);
        assert_eq!(snapshot.value(Control::Brightness), 2);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let state = ConfigurationState::new();
        let before = state.snapshot();
        state.set(Control::GaussianBlur, 1);
        assert!(!before.blur);
        assert!(state.snapshot().blur);
    }

    #[test]
    fn clones_share_state() {
        let state = ConfigurationState::new();
        let surface = state.clone();
        surface.set(Control::Record, 1);
        assert!(state.snapshot().record);
    }

    #[test]
    fn concurrent_updates_are_never_lost() {
        let state = ConfigurationState::new();
        let writers: Vec<_> = Control::ALL
            .into_iter()
            .map(|control| {
                let state = state.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        state.set(control, i % 2);
                    }
                    state.set(control, control.max() as i64);
                })
            })
            .collect();

        for _ in 0..1000 {
            let snapshot = state.snapshot();
            assert!(snapshot.brightness.level() <= Control::Brightness.max());
        }
        for writer in writers {
            writer.join().unwrap();
        }

        let done = state.snapshot();
        for control in Control::ALL {
            assert_eq!(done.value(control), control.max());
        }
    }
}
