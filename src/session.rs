use std::time::Duration;

use crate::detect::{BandId, BeatEvent, DispatcherConfig, FeatureSample, FilterMode, MultiBandDispatcher};
use crate::error::Result;
use crate::pulse::{PulseConfig, PulseDecayEngine, RenderFrame, RenderSink, TickScheduler};
use crate::settings::Settings;
use crate::tempo::TempoEstimator;

/// Intensity used for beats fired by hand.
pub const MANUAL_INTENSITY: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Playback {
    Stopped,
    Playing,
    Paused,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionConfig {
    pub dispatcher: DispatcherConfig,
    pub pulse: PulseConfig,
    pub settings: Settings,
    pub mode: FilterMode,
}

/// Ties detectors, tempo cooldown and the pulse engine to a playback
/// lifecycle.
///
/// Detector state lives for one playback run and is cleared on
/// [`stop`](Self::stop) and [`load`](Self::load). The pulse engine outlives
/// runs and is only reset to idle.
pub struct BeatSession<T: TickScheduler> {
    dispatcher: MultiBandDispatcher,
    engine: PulseDecayEngine<T>,
    settings: Settings,
    mode: FilterMode,
    playback: Playback,
    bpm: Option<f32>,
}

impl<T: TickScheduler> BeatSession<T> {
    pub fn new(config: SessionConfig, scheduler: T) -> Result<Self> {
        Ok(Self {
            dispatcher: MultiBandDispatcher::new(config.dispatcher, None)?,
            engine: PulseDecayEngine::new(config.pulse, scheduler)?,
            settings: config.settings,
            mode: config.mode,
            playback: Playback::Stopped,
            bpm: None,
        })
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// Tempo in use for the current stream, rounded to whole BPM.
    pub fn bpm(&self) -> Option<f32> {
        self.bpm
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        if mode != self.mode {
            log::info!("filter mode: {:?}", mode);
            self.mode = mode;
        }
    }

    pub fn dispatcher(&self) -> &MultiBandDispatcher {
        &self.dispatcher
    }

    pub fn engine(&self) -> &PulseDecayEngine<T> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PulseDecayEngine<T> {
        &mut self.engine
    }

    /// Starts or resumes playback.
    ///
    /// The estimator is consulted once per loaded stream. A failed estimate
    /// is not an error: the fallback cooldown applies and playback goes on.
    pub fn start(&mut self, estimator: &mut dyn TempoEstimator) {
        match self.playback {
            Playback::Playing => return,
            Playback::Paused => {
                self.playback = Playback::Playing;
                self.engine.resume();
                log::info!("playback resumed");
                return;
            }
            Playback::Stopped => {}
        }

        if self.bpm.is_none() {
            self.bpm = match estimator.estimate_tempo() {
                Ok(bpm) => Some(bpm.round()),
                Err(err) => {
                    log::warn!("{}; using fallback cooldown", err);
                    None
                }
            };
        }
        self.dispatcher.set_tempo(self.bpm);
        self.dispatcher.reset();
        self.playback = Playback::Playing;

        log::info!(
            "playback started: tempo={} baseline cooldown={:.0}ms",
            self.bpm
                .map_or_else(|| "unknown".to_string(), |bpm| format!("{:.0} BPM", bpm)),
            self.dispatcher.cooldown().baseline().as_secs_f64() * 1000.0
        );
    }

    /// Suspends playback. Detector windows survive; the pulse loop halts.
    pub fn pause(&mut self) {
        if self.playback == Playback::Playing {
            self.playback = Playback::Paused;
            self.engine.pause();
            log::info!("playback paused");
        }
    }

    /// Ends the run: detectors start a fresh warm-up next time and the pulse
    /// engine goes idle with its background cleared.
    pub fn stop<S: RenderSink + ?Sized>(&mut self, sink: &mut S) {
        self.dispatcher.reset();
        let had_residue = self.engine.has_residue();
        self.engine.reset();
        if had_residue {
            sink.clear_background();
        }
        if self.playback != Playback::Stopped {
            log::info!("playback stopped");
        }
        self.playback = Playback::Stopped;
    }

    /// Switches to a new stream; its tempo will be estimated on next start.
    pub fn load<S: RenderSink + ?Sized>(&mut self, sink: &mut S) {
        self.stop(sink);
        self.bpm = None;
    }

    /// Feature-stream callback. Samples arriving while not playing are ignored.
    pub fn on_sample<S: RenderSink + ?Sized>(
        &mut self,
        sample: &FeatureSample,
        sink: &mut S,
    ) -> Option<BeatEvent> {
        if self.playback != Playback::Playing {
            return None;
        }
        let event = self.dispatcher.dispatch(sample, self.mode, &self.settings)?;
        self.emit(&event, sample.timestamp, sink);
        Some(event)
    }

    pub fn on_frame<S: RenderSink + ?Sized>(
        &mut self,
        samples: &[FeatureSample],
        sink: &mut S,
    ) -> Vec<BeatEvent> {
        samples
            .iter()
            .filter_map(|sample| self.on_sample(sample, &mut *sink))
            .collect()
    }

    /// Fires the overall and bass effects by hand, bypassing the detectors.
    pub fn manual_trigger<S: RenderSink + ?Sized>(&mut self, now: Duration, sink: &mut S) -> [BeatEvent; 2] {
        let events = [BandId::Overall, BandId::Bass].map(|band| BeatEvent {
            band,
            intensity: MANUAL_INTENSITY,
        });
        for event in &events {
            self.emit(event, now, &mut *sink);
        }
        events
    }

    /// Animation-frame callback.
    pub fn tick<S: RenderSink + ?Sized>(&mut self, now: Duration, sink: &mut S) -> Option<RenderFrame> {
        self.engine.tick(now, sink)
    }

    fn emit<S: RenderSink + ?Sized>(&mut self, event: &BeatEvent, at: Duration, sink: &mut S) {
        sink.spawn_shape(event, at, &self.settings);
        self.engine.trigger_pulse(event.intensity, at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BeatError;
    use crate::pulse::PendingTick;
    use crate::tempo::KnownTempo;

    #[derive(Default)]
    struct Recorder {
        shapes: Vec<(BeatEvent, Duration)>,
        frames: usize,
        clears: usize,
    }

    impl RenderSink for Recorder {
        fn paint_background(&mut self, _frame: &RenderFrame) {
            self.frames += 1;
        }

        fn clear_background(&mut self) {
            self.clears += 1;
        }

        fn spawn_shape(&mut self, event: &BeatEvent, at: Duration, _settings: &Settings) {
            self.shapes.push((*event, at));
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn session(history_size: usize) -> BeatSession<PendingTick> {
        let mut config = SessionConfig::default();
        config.dispatcher = config.dispatcher.with_history_size(history_size);
        config.settings.set_sensitivity(1.0).unwrap();
        BeatSession::new(config, PendingTick::new()).unwrap()
    }

    fn feed_bass(s: &mut BeatSession<PendingTick>, sink: &mut Recorder, values: &[f32], start_ms: u64) -> Vec<BeatEvent> {
        values
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| {
                let sample = FeatureSample::new(BandId::Bass, v, ms(start_ms + i as u64 * 20));
                s.on_sample(&sample, &mut *sink)
            })
            .collect()
    }

    #[test]
    fn ignores_samples_until_started() {
        let mut s = session(3);
        let mut sink = Recorder::default();
        assert!(feed_bass(&mut s, &mut sink, &[1.0, 1.0, 1.0, 9.0], 0).is_empty());
        assert!(s.dispatcher().detector(BandId::Bass).history().is_empty());
    }

    #[test]
    fn beat_fans_out_to_sink_and_engine() {
        let mut s = session(3);
        let mut sink = Recorder::default();
        s.start(&mut KnownTempo(Some(120.0)));
        let events = feed_bass(&mut s, &mut sink, &[1.0, 1.0, 1.0, 5.0], 0);
        assert_eq!(events.len(), 1);
        assert_eq!(sink.shapes.len(), 1);
        assert_eq!(sink.shapes[0].1, ms(60));
        assert!(s.engine().is_running());
        assert!(s.engine().level() > 0.0);

        let frame = s.tick(ms(76), &mut sink).unwrap();
        assert_eq!(frame.fade, 1.0);
        assert_eq!(sink.frames, 1);
    }

    #[test]
    fn failed_tempo_uses_fallback() {
        let mut s = session(3);
        let mut failing = || -> Result<f32> { Err(BeatError::TempoEstimationFailed("silence".into())) };
        s.start(&mut failing);
        assert_eq!(s.playback(), Playback::Playing);
        assert_eq!(s.bpm(), None);
        assert_eq!(s.dispatcher().cooldown().baseline(), crate::detect::FALLBACK_BASELINE);
    }

    #[test]
    fn tempo_is_rounded_and_estimated_once_per_stream() {
        let mut s = session(3);
        let mut sink = Recorder::default();
        let mut calls = 0;
        let mut estimator = || -> Result<f32> {
            calls += 1;
            Ok(119.6)
        };
        s.start(&mut estimator);
        assert_eq!(s.bpm(), Some(120.0));
        s.stop(&mut sink);
        s.start(&mut estimator);
        s.load(&mut sink);
        assert_eq!(s.bpm(), None);
        s.start(&mut estimator);
        drop(estimator);
        assert_eq!(calls, 2);
    }

    #[test]
    fn stop_resets_detectors_and_engine() {
        let mut s = session(3);
        let mut sink = Recorder::default();
        s.start(&mut KnownTempo(None));
        feed_bass(&mut s, &mut sink, &[1.0, 1.0, 1.0, 5.0], 0);
        assert!(s.engine().is_running());

        s.stop(&mut sink);
        assert_eq!(s.playback(), Playback::Stopped);
        assert!(s.dispatcher().detector(BandId::Bass).history().is_empty());
        assert_eq!(s.engine().level(), 0.0);
        assert!(!s.engine().is_running());
        assert!(!s.engine().scheduler().is_pending());
        assert_eq!(sink.clears, 1);

        // fresh warm-up after restart
        s.start(&mut KnownTempo(None));
        assert!(feed_bass(&mut s, &mut sink, &[1.0, 1.0, 50.0], 1000).is_empty());
    }

    #[test]
    fn pause_keeps_history_and_halts_loop() {
        let mut s = session(3);
        let mut sink = Recorder::default();
        s.start(&mut KnownTempo(None));
        feed_bass(&mut s, &mut sink, &[1.0, 1.0, 1.0, 5.0], 0);
        s.pause();
        assert_eq!(s.playback(), Playback::Paused);
        assert!(!s.engine().is_running());
        assert_eq!(s.dispatcher().detector(BandId::Bass).history().len(), 3);

        s.start(&mut KnownTempo(None));
        assert_eq!(s.playback(), Playback::Playing);
        assert_eq!(s.dispatcher().detector(BandId::Bass).history().len(), 3);
    }

    #[test]
    fn resumed_session_fades_out_paused_frame() {
        let mut s = session(3);
        let mut sink = Recorder::default();
        s.start(&mut KnownTempo(None));
        feed_bass(&mut s, &mut sink, &[1.0, 1.0, 1.0, 5.0], 0);
        assert!(s.engine_mut().scheduler_mut().take());
        s.tick(ms(76), &mut sink);
        s.pause();
        s.start(&mut KnownTempo(None));

        // quiet stream, ticking whenever a frame is requested
        let mut t = 200;
        while t < 5200 {
            let sample = FeatureSample::new(BandId::Bass, 1.0, ms(t));
            assert!(s.on_sample(&sample, &mut sink).is_none());
            if s.engine_mut().scheduler_mut().take() {
                s.tick(ms(t + 10), &mut sink);
            }
            t += 20;
        }
        assert!(!s.engine().is_running());
        assert!(sink.frames > 1);
        assert_eq!(sink.clears, 1);
    }

    #[test]
    fn stop_while_paused_clears_frame() {
        let mut s = session(3);
        let mut sink = Recorder::default();
        s.start(&mut KnownTempo(None));
        feed_bass(&mut s, &mut sink, &[1.0, 1.0, 1.0, 5.0], 0);
        s.tick(ms(76), &mut sink);
        s.pause();
        assert_eq!(sink.clears, 0);
        s.stop(&mut sink);
        assert_eq!(sink.clears, 1);
        assert!(!s.engine().has_residue());
    }

    #[test]
    fn manual_trigger_bypasses_detectors() {
        let mut s = session(3);
        let mut sink = Recorder::default();
        let events = s.manual_trigger(ms(10), &mut sink);
        assert_eq!(events[0].band, BandId::Overall);
        assert_eq!(events[1].band, BandId::Bass);
        assert_eq!(sink.shapes.len(), 2);
        assert!(s.engine().is_running());
        assert_eq!(s.dispatcher().detector(BandId::Bass).last_beat(), None);
    }

    #[test]
    fn muted_band_produces_nothing() {
        let mut s = session(2);
        let mut sink = Recorder::default();
        s.set_mode(FilterMode::Mids);
        s.start(&mut KnownTempo(None));
        assert!(feed_bass(&mut s, &mut sink, &[1.0, 1.0, 9.0], 0).is_empty());
        assert!(sink.shapes.is_empty());
    }
}
