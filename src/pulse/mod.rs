pub mod engine;
pub mod schedule;

pub use engine::{PulseConfig, PulseDecayEngine, PulseState};
pub use schedule::{PendingTick, RenderFrame, RenderSink, TickScheduler};
