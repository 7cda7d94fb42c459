pub mod band;
pub mod cooldown;
pub mod detector;
pub mod dispatcher;
pub mod history;

pub use band::{BandId, BeatEvent, FeatureSample, FilterMode};
pub use cooldown::{baseline_cooldown, BandFactors, TempoCooldown, FALLBACK_BASELINE};
pub use detector::{BandBeatDetector, CooldownPolicy, DetectorConfig, ThresholdPolicy};
pub use dispatcher::{DispatcherConfig, MultiBandDispatcher};
pub use history::RollingHistory;
