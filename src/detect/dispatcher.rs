use std::time::Duration;

use super::band::{BandId, BeatEvent, FeatureSample, FilterMode};
use super::cooldown::{BandFactors, TempoCooldown, FALLBACK_BASELINE};
use super::detector::{BandBeatDetector, CooldownPolicy, DetectorConfig, ThresholdPolicy};
use crate::error::Result;
use crate::settings::Settings;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DispatcherConfig {
    pub bass: DetectorConfig,
    pub mids: DetectorConfig,
    pub overall: DetectorConfig,
    pub factors: BandFactors,
    pub fallback_cooldown: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        let base = DetectorConfig::default();
        Self {
            bass: base,
            mids: base,
            overall: DetectorConfig {
                cooldown_policy: CooldownPolicy::Skip,
                ..base
            },
            factors: BandFactors::default(),
            fallback_cooldown: FALLBACK_BASELINE,
        }
    }
}

impl DispatcherConfig {
    /// Mean-scaled thresholds on every band. Overall still skips samples
    /// while debounced; the other bands keep recording them.
    pub fn legacy() -> Self {
        let mut config = Self::default();
        for detector in [&mut config.bass, &mut config.mids, &mut config.overall] {
            detector.threshold_policy = ThresholdPolicy::MeanScaled;
        }
        config
    }

    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.bass.history_size = history_size;
        self.mids.history_size = history_size;
        self.overall.history_size = history_size;
        self
    }

    pub fn detector(&self, band: BandId) -> &DetectorConfig {
        match band {
            BandId::Bass => &self.bass,
            BandId::Mids => &self.mids,
            BandId::Overall => &self.overall,
        }
    }
}

/// Routes feature samples to their band detector, honouring the filter mode.
#[derive(Clone, Debug)]
pub struct MultiBandDispatcher {
    detectors: [BandBeatDetector; 3],
    cooldown: TempoCooldown,
    config: DispatcherConfig,
}

impl MultiBandDispatcher {
    pub fn new(config: DispatcherConfig, bpm: Option<f32>) -> Result<Self> {
        let detectors = [
            BandBeatDetector::new(BandId::Bass, config.bass)?,
            BandBeatDetector::new(BandId::Mids, config.mids)?,
            BandBeatDetector::new(BandId::Overall, config.overall)?,
        ];
        let cooldown = TempoCooldown::new(bpm, config.fallback_cooldown, config.factors)?;
        Ok(Self {
            detectors,
            cooldown,
            config,
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn cooldown(&self) -> &TempoCooldown {
        &self.cooldown
    }

    pub fn detector(&self, band: BandId) -> &BandBeatDetector {
        &self.detectors[band.index()]
    }

    /// Recomputes the cooldown baseline for a new tempo estimate.
    pub fn set_tempo(&mut self, bpm: Option<f32>) {
        self.cooldown.set_tempo(bpm);
    }

    /// Feeds `sample` to its band detector unless `mode` mutes that band.
    ///
    /// A muted detector sees nothing: its window and cooldown stay as they
    /// were.
    pub fn dispatch(
        &mut self,
        sample: &FeatureSample,
        mode: FilterMode,
        settings: &Settings,
    ) -> Option<BeatEvent> {
        if !mode.admits(sample.band) {
            return None;
        }
        let cooldown = self.cooldown.effective(sample.band, settings.cooldown_multiplier());
        let detector = &mut self.detectors[sample.band.index()];
        detector.apply_sensitivity(settings.sensitivity());
        let event = detector.observe_sample(sample, cooldown);
        if let Some(ref event) = event {
            log::debug!(
                "beat on {} at {:.3}s (intensity {:.4})",
                event.band,
                sample.timestamp.as_secs_f32(),
                event.intensity
            );
        }
        event
    }

    /// Dispatches samples that arrived on the same audio frame.
    ///
    /// Each band reports independently; events are not merged.
    pub fn dispatch_frame(
        &mut self,
        samples: &[FeatureSample],
        mode: FilterMode,
        settings: &Settings,
    ) -> Vec<BeatEvent> {
        samples
            .iter()
            .filter_map(|sample| self.dispatch(sample, mode, settings))
            .collect()
    }

    /// Clears every band's window and cooldown.
    pub fn reset(&mut self) {
        for detector in &mut self.detectors {
            detector.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn settings(sensitivity: f32, cooldown_multiplier: f32) -> Settings {
        Settings::new(sensitivity, cooldown_multiplier, 10.0, ms(2000)).unwrap()
    }

    fn warm_up(dispatcher: &mut MultiBandDispatcher, band: BandId, n: u64, s: &Settings) {
        for i in 0..n {
            let sample = FeatureSample::new(band, 1.0, ms(i * 20));
            assert!(dispatcher.dispatch(&sample, FilterMode::Full, s).is_none());
        }
    }

    #[test]
    fn tempo_cooldown_suppresses_follow_up() {
        let s = settings(1.0, 2.0);
        let mut dispatcher =
            MultiBandDispatcher::new(DispatcherConfig::default().with_history_size(3), Some(120.0)).unwrap();
        warm_up(&mut dispatcher, BandId::Bass, 3, &s);

        let beat = FeatureSample::new(BandId::Bass, 5.0, ms(1000));
        let event = dispatcher.dispatch(&beat, FilterMode::Full, &s).unwrap();
        assert!((event.intensity - 4.0).abs() < 1e-6);

        // 0.25s baseline * 2.0 multiplier * 1.0 bass factor = 0.5s
        let follow_up = FeatureSample::new(BandId::Bass, 1.0e6, ms(1300));
        assert!(dispatcher.dispatch(&follow_up, FilterMode::Full, &s).is_none());
    }

    #[test]
    fn muted_band_state_is_frozen() {
        let s = settings(1.0, 1.0);
        let mut dispatcher =
            MultiBandDispatcher::new(DispatcherConfig::default().with_history_size(3), None).unwrap();
        for i in 0..5 {
            let sample = FeatureSample::new(BandId::Mids, 100.0, ms(i * 20));
            assert!(dispatcher.dispatch(&sample, FilterMode::Bass, &s).is_none());
        }
        assert!(dispatcher.detector(BandId::Mids).history().is_empty());
        assert_eq!(dispatcher.detector(BandId::Mids).last_beat(), None);
    }

    #[test]
    fn same_frame_bands_report_independently() {
        let s = settings(1.0, 1.0);
        let mut dispatcher =
            MultiBandDispatcher::new(DispatcherConfig::default().with_history_size(2), None).unwrap();
        for i in 0..2 {
            let frame = [
                FeatureSample::new(BandId::Bass, 1.0, ms(i * 20)),
                FeatureSample::new(BandId::Overall, 1.0, ms(i * 20)),
            ];
            assert!(dispatcher.dispatch_frame(&frame, FilterMode::Full, &s).is_empty());
        }
        let frame = [
            FeatureSample::new(BandId::Bass, 3.0, ms(40)),
            FeatureSample::new(BandId::Overall, 2.0, ms(40)),
        ];
        let events = dispatcher.dispatch_frame(&frame, FilterMode::Full, &s);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].band, BandId::Bass);
        assert_eq!(events[1].band, BandId::Overall);
        assert!((events[0].intensity - 2.0).abs() < 1e-6);
        assert!((events[1].intensity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sensitivity_change_applies_on_next_sample() {
        let mut dispatcher =
            MultiBandDispatcher::new(DispatcherConfig::legacy().with_history_size(2), None).unwrap();
        let mut s = settings(1.0, 1.0);
        warm_up(&mut dispatcher, BandId::Overall, 2, &s);
        s.set_sensitivity(3.0).unwrap();
        // mean 1.0 * 3.0 = 3.0
        let sample = FeatureSample::new(BandId::Overall, 2.5, ms(100));
        assert!(dispatcher.dispatch(&sample, FilterMode::Full, &s).is_none());
        assert_eq!(dispatcher.detector(BandId::Overall).config().threshold_multiplier, 3.0);
    }

    #[test]
    fn huge_cooldown_multiplier_blocks_after_first_beat() {
        let s = settings(1.0, 1e30);
        let mut dispatcher =
            MultiBandDispatcher::new(DispatcherConfig::default().with_history_size(2), Some(1e-20)).unwrap();
        assert_eq!(dispatcher.cooldown().baseline(), FALLBACK_BASELINE);
        warm_up(&mut dispatcher, BandId::Bass, 2, &s);
        let beat = FeatureSample::new(BandId::Bass, 5.0, ms(100));
        assert!(dispatcher.dispatch(&beat, FilterMode::Full, &s).is_some());
        let much_later = FeatureSample::new(BandId::Bass, 1.0e9, ms(3_600_000));
        assert!(dispatcher.dispatch(&much_later, FilterMode::Full, &s).is_none());
    }

    #[test]
    fn settings_sensitivity_overrides_configured_multiplier() {
        let mut config = DispatcherConfig::default().with_history_size(2);
        config.bass.threshold_multiplier = 100.0;
        let mut dispatcher = MultiBandDispatcher::new(config, None).unwrap();
        let s = settings(1.0, 1.0);
        let warm = [
            FeatureSample::new(BandId::Bass, 1.0, ms(0)),
            FeatureSample::new(BandId::Bass, 3.0, ms(20)),
        ];
        assert!(dispatcher.dispatch_frame(&warm, FilterMode::Full, &s).is_empty());
        // mean 2.0 + std 1.0 * 1.0; a multiplier of 100 would need 102
        let sample = FeatureSample::new(BandId::Bass, 3.5, ms(100));
        assert!(dispatcher.dispatch(&sample, FilterMode::Full, &s).is_some());
        assert_eq!(dispatcher.detector(BandId::Bass).config().threshold_multiplier, 1.0);
    }

    #[test]
    fn reset_clears_all_bands() {
        let s = settings(1.0, 1.0);
        let mut dispatcher =
            MultiBandDispatcher::new(DispatcherConfig::default().with_history_size(2), None).unwrap();
        warm_up(&mut dispatcher, BandId::Bass, 2, &s);
        warm_up(&mut dispatcher, BandId::Mids, 1, &s);
        dispatcher.reset();
        for band in BandId::ALL {
            assert!(dispatcher.detector(band).history().is_empty());
        }
    }

    #[test]
    fn invalid_history_size_is_rejected() {
        assert!(MultiBandDispatcher::new(DispatcherConfig::default().with_history_size(0), None).is_err());
    }

    #[test]
    fn set_tempo_updates_baseline() {
        let mut dispatcher = MultiBandDispatcher::new(DispatcherConfig::default(), None).unwrap();
        assert_eq!(dispatcher.cooldown().baseline(), FALLBACK_BASELINE);
        dispatcher.set_tempo(Some(60.0));
        assert!((dispatcher.cooldown().baseline().as_secs_f64() - 0.5).abs() < 1e-9);
    }
}
