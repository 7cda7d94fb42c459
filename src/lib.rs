//! Real-time beat decisions over a stream of per-band energy samples.
//!
//! Samples flow through a [`MultiBandDispatcher`] into one adaptive
//! [`BandBeatDetector`] per band. Detected beats fan out to a
//! [`RenderSink`] and into the [`PulseDecayEngine`], whose animation loop
//! runs only while there is recent beat activity.

pub mod detect;
pub mod error;
pub mod pulse;
pub mod session;
pub mod settings;
pub mod stream;
pub mod tempo;

pub use detect::{
    BandBeatDetector, BandId, BeatEvent, DetectorConfig, DispatcherConfig, FeatureSample, FilterMode,
    MultiBandDispatcher,
};
pub use error::{BeatError, Result};
pub use pulse::{PendingTick, PulseConfig, PulseDecayEngine, RenderFrame, RenderSink, TickScheduler};
pub use session::{BeatSession, Playback, SessionConfig};
pub use settings::Settings;
pub use tempo::{KnownTempo, TempoEstimator};
