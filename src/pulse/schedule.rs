use serde::Serialize;
use std::time::Duration;

use crate::detect::BeatEvent;
use crate::settings::Settings;

/// Host-side animation clock. The engine asks for exactly one tick at a time
/// and cancels when it goes idle.
pub trait TickScheduler {
    fn request_tick(&mut self);
    fn cancel_tick(&mut self);
}

/// Background/foreground painter fed by the session.
pub trait RenderSink {
    fn paint_background(&mut self, frame: &RenderFrame);

    /// Removes whatever the last background frame left on screen.
    fn clear_background(&mut self);

    fn spawn_shape(&mut self, _event: &BeatEvent, _at: Duration, _settings: &Settings) {}
}

/// One animation tick's worth of background state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RenderFrame {
    pub level: f32,
    pub fade: f32,
    #[serde(skip)]
    pub at: Duration,
}

/// Scheduler for hosts that poll: a request just raises a flag which the
/// host consumes with [`PendingTick::take`] when its next frame is due.
#[derive(Clone, Debug, Default)]
pub struct PendingTick {
    pending: bool,
    requests: u64,
    cancels: u64,
}

impl PendingTick {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consumes the outstanding request, if any.
    pub fn take(&mut self) -> bool {
        std::mem::replace(&mut self.pending, false)
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn cancels(&self) -> u64 {
        self.cancels
    }
}

impl TickScheduler for PendingTick {
    fn request_tick(&mut self) {
        self.pending = true;
        self.requests += 1;
    }

    fn cancel_tick(&mut self) {
        self.pending = false;
        self.cancels += 1;
    }
}
