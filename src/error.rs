use thiserror::Error;

pub type Result<T> = std::result::Result<T, BeatError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BeatError {
    /// A detector, cooldown or pulse parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The tempo collaborator could not produce an estimate.
    #[error("tempo estimation failed: {0}")]
    TempoEstimationFailed(String),
}

impl BeatError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        BeatError::InvalidConfiguration(msg.into())
    }
}

/// Rejects zero, negative, NaN and infinite values.
pub(crate) fn ensure_positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(BeatError::invalid(format!("{} must be positive, got {}", name, value)))
    }
}
