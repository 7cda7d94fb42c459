use std::time::Duration;

use crate::error::{ensure_positive, BeatError, Result};

/// Runtime-adjustable user settings.
///
/// Fields are private so a `Settings` value is always valid; the setters
/// reject out-of-range input and leave the previous value in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    sensitivity: f32,
    cooldown_multiplier: f32,
    max_scale: f32,
    animation_duration: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sensitivity: 1.4,
            cooldown_multiplier: 1.0,
            max_scale: 10.0,
            animation_duration: Duration::from_millis(2000),
        }
    }
}

impl Settings {
    pub fn new(
        sensitivity: f32,
        cooldown_multiplier: f32,
        max_scale: f32,
        animation_duration: Duration,
    ) -> Result<Self> {
        let mut settings = Settings::default();
        settings.set_sensitivity(sensitivity)?;
        settings.set_cooldown_multiplier(cooldown_multiplier)?;
        settings.set_max_scale(max_scale)?;
        settings.set_animation_duration(animation_duration)?;
        Ok(settings)
    }

    /// Threshold multiplier; higher means fewer beats.
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn cooldown_multiplier(&self) -> f32 {
        self.cooldown_multiplier
    }

    pub fn max_scale(&self) -> f32 {
        self.max_scale
    }

    pub fn animation_duration(&self) -> Duration {
        self.animation_duration
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) -> Result<()> {
        if !(sensitivity.is_finite() && sensitivity >= 0.0) {
            return Err(BeatError::invalid(format!(
                "sensitivity must be a non-negative number, got {}",
                sensitivity
            )));
        }
        self.sensitivity = sensitivity;
        Ok(())
    }

    pub fn set_cooldown_multiplier(&mut self, multiplier: f32) -> Result<()> {
        ensure_positive("cooldown multiplier", multiplier)?;
        self.cooldown_multiplier = multiplier;
        Ok(())
    }

    pub fn set_max_scale(&mut self, max_scale: f32) -> Result<()> {
        ensure_positive("max scale", max_scale)?;
        self.max_scale = max_scale;
        Ok(())
    }

    pub fn set_animation_duration(&mut self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return Err(BeatError::invalid("animation duration must be positive"));
        }
        self.animation_duration = duration;
        Ok(())
    }

    /// Scale hint for a foreground shape spawned by a beat of `intensity`.
    pub fn shape_scale(&self, intensity: f32) -> f32 {
        (1.0 + intensity.max(0.0)).min(self.max_scale)
    }
}
