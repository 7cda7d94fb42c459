use std::time::Duration;

use super::band::BandId;
use crate::error::{ensure_positive, Result};

/// Baseline used when no tempo estimate is available.
pub const FALLBACK_BASELINE: Duration = Duration::from_millis(200);

/// Maps a tempo estimate to the baseline debounce window.
///
/// The baseline is half of one quarter-note interval: `(60 / bpm) / 2`.
/// A missing, zero, negative or non-finite tempo yields `fallback`, as does
/// one so slow its interval does not fit a `Duration`.
pub fn baseline_cooldown(bpm: Option<f32>, fallback: Duration) -> Duration {
    match bpm {
        Some(bpm) if bpm.is_finite() && bpm > 0.0 => {
            Duration::try_from_secs_f64((60.0 / f64::from(bpm)) / 2.0).unwrap_or(fallback)
        }
        _ => fallback,
    }
}

/// Per-band scaling of the shared baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandFactors {
    pub bass: f32,
    pub mids: f32,
    pub overall: f32,
}

impl Default for BandFactors {
    fn default() -> Self {
        Self {
            bass: 1.0,
            mids: 0.5,
            overall: 2.0,
        }
    }
}

impl BandFactors {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("bass band factor", self.bass)?;
        ensure_positive("mids band factor", self.mids)?;
        ensure_positive("overall band factor", self.overall)
    }

    pub fn get(&self, band: BandId) -> f32 {
        match band {
            BandId::Bass => self.bass,
            BandId::Mids => self.mids,
            BandId::Overall => self.overall,
        }
    }
}

/// Tempo-derived cooldown for one playback session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoCooldown {
    baseline: Duration,
    fallback: Duration,
    factors: BandFactors,
}

impl TempoCooldown {
    pub fn new(bpm: Option<f32>, fallback: Duration, factors: BandFactors) -> Result<Self> {
        ensure_positive("fallback cooldown", fallback.as_secs_f32())?;
        factors.validate()?;
        Ok(Self {
            baseline: baseline_cooldown(bpm, fallback),
            fallback,
            factors,
        })
    }

    /// Re-derives the baseline for a new estimate, keeping fallback and factors.
    pub fn set_tempo(&mut self, bpm: Option<f32>) {
        self.baseline = baseline_cooldown(bpm, self.fallback);
    }

    pub fn baseline(&self) -> Duration {
        self.baseline
    }

    pub fn factors(&self) -> &BandFactors {
        &self.factors
    }

    /// `baseline * cooldown_multiplier * band_factor`, saturating at
    /// `Duration::MAX`.
    pub fn effective(&self, band: BandId, cooldown_multiplier: f32) -> Duration {
        let scale = f64::from(cooldown_multiplier.max(0.0)) * f64::from(self.factors.get(band));
        Duration::try_from_secs_f64(self.baseline.as_secs_f64() * scale).unwrap_or(Duration::MAX)
    }
}
