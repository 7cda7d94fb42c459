use serde::Deserialize;
use std::time::Duration;

use super::band::{BandId, BeatEvent, FeatureSample};
use super::history::RollingHistory;
use crate::error::{BeatError, Result};

/// How the adaptive threshold is derived from the rolling window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// `mean + std_dev * multiplier`
    #[default]
    MeanStdDev,
    /// `mean * multiplier`
    MeanScaled,
}

/// Whether samples arriving during cooldown still feed the rolling window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownPolicy {
    /// Drop the sample; the window only sees samples that were checked.
    Skip,
    /// Keep the window tracking the signal while debounced.
    #[default]
    Record,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    pub history_size: usize,
    /// Starting multiplier. Under a [`super::MultiBandDispatcher`] it is
    /// replaced by the session sensitivity on every sample.
    pub threshold_multiplier: f32,
    pub threshold_policy: ThresholdPolicy,
    pub cooldown_policy: CooldownPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            history_size: 24,
            threshold_multiplier: 1.4,
            threshold_policy: ThresholdPolicy::MeanStdDev,
            cooldown_policy: CooldownPolicy::Record,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_size == 0 {
            return Err(BeatError::invalid("history_size must be at least 1"));
        }
        validate_multiplier(self.threshold_multiplier)
    }
}

fn validate_multiplier(multiplier: f32) -> Result<()> {
    if multiplier.is_finite() && multiplier >= 0.0 {
        Ok(())
    } else {
        Err(BeatError::invalid(format!(
            "threshold multiplier must be a non-negative number, got {}",
            multiplier
        )))
    }
}

/// Adaptive beat detector for a single band.
///
/// Owns the band's rolling window and the instant of its last beat. State is
/// only ever mutated through [`BandBeatDetector::observe`] and
/// [`BandBeatDetector::reset`].
#[derive(Clone, Debug)]
pub struct BandBeatDetector {
    band: BandId,
    config: DetectorConfig,
    history: RollingHistory,
    last_beat: Option<Duration>,
}

impl BandBeatDetector {
    pub fn new(band: BandId, config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            band,
            history: RollingHistory::new(config.history_size),
            config,
            last_beat: None,
        })
    }

    pub fn band(&self) -> BandId {
        self.band
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn history(&self) -> &RollingHistory {
        &self.history
    }

    pub fn last_beat(&self) -> Option<Duration> {
        self.last_beat
    }

    pub fn is_warmed_up(&self) -> bool {
        self.history.is_full()
    }

    /// For detectors driven directly through [`BandBeatDetector::observe`].
    pub fn set_threshold_multiplier(&mut self, multiplier: f32) -> Result<()> {
        validate_multiplier(multiplier)?;
        self.config.threshold_multiplier = multiplier;
        Ok(())
    }

    /// Takes a multiplier already validated by [`crate::Settings`].
    pub(crate) fn apply_sensitivity(&mut self, multiplier: f32) {
        self.config.threshold_multiplier = multiplier;
    }

    pub fn in_cooldown(&self, now: Duration, cooldown: Duration) -> bool {
        match self.last_beat {
            Some(last) => now.saturating_sub(last) < cooldown,
            None => false,
        }
    }

    /// Current threshold over the window, before the next sample is added.
    pub fn threshold(&self) -> f32 {
        let (mean, std_dev) = self.history.mean_and_std_dev();
        match self.config.threshold_policy {
            ThresholdPolicy::MeanStdDev => mean + std_dev * self.config.threshold_multiplier,
            ThresholdPolicy::MeanScaled => mean * self.config.threshold_multiplier,
        }
    }

    /// Feeds one value and returns the beat intensity, or 0.0 when no beat.
    pub fn observe(&mut self, value: f32, now: Duration, cooldown: Duration) -> f32 {
        if self.in_cooldown(now, cooldown) {
            if self.config.cooldown_policy == CooldownPolicy::Record {
                self.history.push(value);
            }
            return 0.0;
        }

        // Warm-up: no decisions until the baseline window is complete.
        if !self.history.is_full() {
            self.history.push(value);
            return 0.0;
        }

        let threshold = self.threshold();
        self.history.push(value);

        if value > threshold {
            self.last_beat = Some(now);
            log::trace!(
                "{} beat: value={:.4} threshold={:.4}",
                self.band,
                value,
                threshold
            );
            value - threshold
        } else {
            0.0
        }
    }

    /// Sample-level wrapper around [`observe`](Self::observe).
    pub fn observe_sample(&mut self, sample: &FeatureSample, cooldown: Duration) -> Option<BeatEvent> {
        let intensity = self.observe(sample.value, sample.timestamp, cooldown);
        (intensity > 0.0).then_some(BeatEvent {
            band: self.band,
            intensity,
        })
    }

    /// Drops the window and cooldown; the next samples start a fresh warm-up.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_beat = None;
    }
}
