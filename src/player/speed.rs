use std::time::Duration;

/// Auto-advance delay at speed 0
const BASE_INTERVAL_MS: f64 = 4000.0;

/// Playback speed on the `[0, 4]` slider, quantized to half steps.
///
/// Speed maps to an auto-advance delay of `4000 / e^speed` ms, so each
/// half step shortens the delay by the same ratio.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PlaybackSpeed(f64);

impl PlaybackSpeed {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 4.0;
    pub const STEP: f64 = 0.5;

    /// Clamp and quantize a raw slider value. Non-finite input falls back to the default.
    pub fn new(value: f64) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        let clamped = value.clamp(Self::MIN, Self::MAX);
        Self((clamped / Self::STEP).round() * Self::STEP)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Delay before the next automatic step
    pub fn interval(self) -> Duration {
        Duration::from_secs_f64(BASE_INTERVAL_MS / self.0.exp() / 1000.0)
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self(2.0)
    }
}
