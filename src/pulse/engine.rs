use std::time::Duration;

use super::schedule::{RenderFrame, RenderSink, TickScheduler};
use crate::error::{ensure_positive, BeatError, Result};

/// Below this the level is treated as fully decayed.
const LEVEL_FLOOR: f32 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseConfig {
    /// Level added per unit of beat intensity.
    pub pulse_gain: f32,
    /// Per-tick multiplier, strictly between 0 and 1.
    pub decay_factor: f32,
    /// Time after the last beat during which the fade stays at 1.0.
    pub fade_start_delay: Duration,
    /// Length of the linear fade that follows the delay.
    pub fade_duration: Duration,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            pulse_gain: 0.5,
            decay_factor: 0.95,
            fade_start_delay: Duration::from_millis(300),
            fade_duration: Duration::from_millis(1500),
        }
    }
}

impl PulseConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("pulse gain", self.pulse_gain)?;
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            return Err(BeatError::invalid(format!(
                "decay factor must be in (0, 1), got {}",
                self.decay_factor
            )));
        }
        if self.fade_duration.is_zero() {
            return Err(BeatError::invalid("fade duration must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PulseState {
    pub level: f32,
    pub last_beat: Option<Duration>,
    pub running: bool,
    /// Paused mid-fade: a painted frame is still on screen.
    pub suspended: bool,
}

/// Accumulates beat pulses into a decaying activity level and owns the
/// animation loop's running/stopped state.
///
/// The loop only runs while there is activity: the first pulse requests a
/// tick, every painted frame requests the next one, and the tick on which the
/// fade reaches zero cancels the schedule and clears the background.
pub struct PulseDecayEngine<T: TickScheduler> {
    config: PulseConfig,
    state: PulseState,
    scheduler: T,
}

impl<T: TickScheduler> PulseDecayEngine<T> {
    pub fn new(config: PulseConfig, scheduler: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: PulseState::default(),
            scheduler,
        })
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    pub fn state(&self) -> &PulseState {
        &self.state
    }

    pub fn level(&self) -> f32 {
        self.state.level
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut T {
        &mut self.scheduler
    }

    pub fn trigger_pulse(&mut self, intensity: f32, now: Duration) {
        if !(intensity.is_finite() && intensity > 0.0) {
            return;
        }
        self.state.last_beat = Some(now);
        self.state.level = (self.state.level + intensity * self.config.pulse_gain).min(1.0);
        self.state.suspended = false;

        if !self.state.running {
            self.state.running = true;
            self.scheduler.request_tick();
            log::debug!("pulse loop started at {:.3}s", now.as_secs_f32());
        }
    }

    /// `1.0` until `fade_start_delay` has elapsed since the last beat, then a
    /// linear ramp down to `0.0` over `fade_duration`.
    pub fn fade_multiplier(&self, now: Duration) -> f32 {
        let Some(last_beat) = self.state.last_beat else {
            return 0.0;
        };
        let elapsed = now.saturating_sub(last_beat);
        if elapsed <= self.config.fade_start_delay {
            return 1.0;
        }
        let fading = (elapsed - self.config.fade_start_delay).as_secs_f32();
        (1.0 - fading / self.config.fade_duration.as_secs_f32()).max(0.0)
    }

    /// Runs one animation tick. Does nothing while stopped.
    pub fn tick<S: RenderSink + ?Sized>(&mut self, now: Duration, sink: &mut S) -> Option<RenderFrame> {
        if !self.state.running {
            return None;
        }

        self.state.level *= self.config.decay_factor;
        if self.state.level < LEVEL_FLOOR {
            self.state.level = 0.0;
        }

        let fade = self.fade_multiplier(now);
        if fade <= 0.0 {
            self.halt();
            sink.clear_background();
            log::debug!("pulse loop stopped at {:.3}s", now.as_secs_f32());
            return None;
        }

        let frame = RenderFrame {
            level: self.state.level,
            fade,
            at: now,
        };
        sink.paint_background(&frame);
        self.scheduler.request_tick();
        Some(frame)
    }

    /// Stops ticking but keeps the level and last beat.
    pub fn halt(&mut self) {
        if self.state.running {
            self.state.running = false;
            self.scheduler.cancel_tick();
        }
    }

    /// Halts the loop, remembering that its last frame is still painted.
    pub fn pause(&mut self) {
        if self.state.running {
            self.halt();
            self.state.suspended = true;
        }
    }

    /// Picks up a paused loop so it can fade out and clear on its own.
    pub fn resume(&mut self) {
        if self.state.suspended {
            self.state.suspended = false;
            self.state.running = true;
            self.scheduler.request_tick();
        }
    }

    /// Whether a frame is on screen that no later tick will clear.
    pub fn has_residue(&self) -> bool {
        self.state.running || self.state.suspended
    }

    /// Back to `level = 0`, stopped.
    pub fn reset(&mut self) {
        self.halt();
        self.state = PulseState::default();
    }
}
