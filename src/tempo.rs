use crate::error::{BeatError, Result};

/// One-shot tempo source consulted when a session starts.
pub trait TempoEstimator {
    fn estimate_tempo(&mut self) -> Result<f32>;
}

/// A tempo supplied up front, e.g. from a tag or the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KnownTempo(pub Option<f32>);

impl TempoEstimator for KnownTempo {
    fn estimate_tempo(&mut self) -> Result<f32> {
        match self.0 {
            Some(bpm) if bpm.is_finite() && bpm > 0.0 => Ok(bpm),
            Some(bpm) => Err(BeatError::TempoEstimationFailed(format!(
                "unusable tempo {}",
                bpm
            ))),
            None => Err(BeatError::TempoEstimationFailed("no tempo available".into())),
        }
    }
}

impl<F> TempoEstimator for F
where
    F: FnMut() -> Result<f32>,
{
    fn estimate_tempo(&mut self) -> Result<f32> {
        self()
    }
}
