use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::BeatError;

/// Frequency band a feature sample was measured on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandId {
    Bass,
    Mids,
    Overall,
}

impl BandId {
    pub const ALL: [BandId; 3] = [BandId::Bass, BandId::Mids, BandId::Overall];

    pub fn as_str(self) -> &'static str {
        match self {
            BandId::Bass => "bass",
            BandId::Mids => "mids",
            BandId::Overall => "overall",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            BandId::Bass => 0,
            BandId::Mids => 1,
            BandId::Overall => 2,
        }
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BandId {
    type Err = BeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bass" => Ok(BandId::Bass),
            "mids" | "mid" => Ok(BandId::Mids),
            "overall" | "full" => Ok(BandId::Overall),
            other => Err(BeatError::invalid(format!("unknown band '{}'", other))),
        }
    }
}

/// Which bands the active filter lets through.
///
/// `Full` admits every band. `Bass` mutes the mids detector and `Mids` mutes
/// the bass detector. `Overall` is the unfiltered mix and is never muted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Full,
    Bass,
    Mids,
}

impl FilterMode {
    pub fn admits(self, band: BandId) -> bool {
        match (self, band) {
            (_, BandId::Overall) => true,
            (FilterMode::Full, _) => true,
            (FilterMode::Bass, BandId::Bass) => true,
            (FilterMode::Mids, BandId::Mids) => true,
            _ => false,
        }
    }
}

impl FromStr for FilterMode {
    type Err = BeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "all" => Ok(FilterMode::Full),
            "bass" => Ok(FilterMode::Bass),
            "mids" | "mid" => Ok(FilterMode::Mids),
            other => Err(BeatError::invalid(format!("unknown filter mode '{}'", other))),
        }
    }
}

/// One periodic energy/loudness reading for a band.
///
/// `timestamp` is the monotonic offset from the start of the stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureSample {
    pub band: BandId,
    pub value: f32,
    pub timestamp: Duration,
}

impl FeatureSample {
    pub fn new(band: BandId, value: f32, timestamp: Duration) -> Self {
        Self { band, value, timestamp }
    }
}

/// A detected beat. `intensity` is the margin above the adaptive threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BeatEvent {
    pub band: BandId,
    pub intensity: f32,
}
