use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use beatpulse::detect::{BandFactors, CooldownPolicy, DispatcherConfig, ThresholdPolicy};
use beatpulse::{FilterMode, PulseConfig, SessionConfig, Settings};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorSection,
    #[serde(default)]
    pub cooldown: CooldownSection,
    #[serde(default)]
    pub pulse: PulseSection,
    #[serde(default)]
    pub settings: SettingsSection,
    #[serde(default)]
    pub replay: ReplaySection,
}

#[derive(Debug, Deserialize)]
pub struct DetectorSection {
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// Applies to every band when set; otherwise each band keeps its default.
    #[serde(default)]
    pub threshold_policy: Option<ThresholdPolicy>,
    #[serde(default)]
    pub cooldown_policy: Option<CooldownPolicy>,
}

#[derive(Debug, Deserialize)]
pub struct CooldownSection {
    #[serde(default = "default_fallback_ms")]
    pub fallback_ms: u64,
    #[serde(default = "default_bass_factor")]
    pub bass_factor: f32,
    #[serde(default = "default_mids_factor")]
    pub mids_factor: f32,
    #[serde(default = "default_overall_factor")]
    pub overall_factor: f32,
}

#[derive(Debug, Deserialize)]
pub struct PulseSection {
    #[serde(default = "default_pulse_gain")]
    pub pulse_gain: f32,
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f32,
    #[serde(default = "default_fade_start_delay_ms")]
    pub fade_start_delay_ms: u64,
    #[serde(default = "default_fade_duration_ms")]
    pub fade_duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct SettingsSection {
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    #[serde(default = "default_cooldown_multiplier")]
    pub cooldown_multiplier: f32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
    #[serde(default = "default_animation_duration_ms")]
    pub animation_duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReplaySection {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub mode: FilterMode,
}

impl Default for DetectorSection {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            threshold_policy: None,
            cooldown_policy: None,
        }
    }
}

impl Default for CooldownSection {
    fn default() -> Self {
        Self {
            fallback_ms: default_fallback_ms(),
            bass_factor: default_bass_factor(),
            mids_factor: default_mids_factor(),
            overall_factor: default_overall_factor(),
        }
    }
}

impl Default for PulseSection {
    fn default() -> Self {
        Self {
            pulse_gain: default_pulse_gain(),
            decay_factor: default_decay_factor(),
            fade_start_delay_ms: default_fade_start_delay_ms(),
            fade_duration_ms: default_fade_duration_ms(),
        }
    }
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            cooldown_multiplier: default_cooldown_multiplier(),
            max_scale: default_max_scale(),
            animation_duration_ms: default_animation_duration_ms(),
        }
    }
}

impl Default for ReplaySection {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            mode: FilterMode::default(),
        }
    }
}

fn default_history_size() -> usize { 24 }
fn default_fallback_ms() -> u64 { 200 }
fn default_bass_factor() -> f32 { 1.0 }
fn default_mids_factor() -> f32 { 0.5 }
fn default_overall_factor() -> f32 { 2.0 }
fn default_pulse_gain() -> f32 { 0.5 }
fn default_decay_factor() -> f32 { 0.95 }
fn default_fade_start_delay_ms() -> u64 { 300 }
fn default_fade_duration_ms() -> u64 { 1500 }
fn default_sensitivity() -> f32 { 1.4 }
fn default_cooldown_multiplier() -> f32 { 1.0 }
fn default_max_scale() -> f32 { 10.0 }
fn default_animation_duration_ms() -> u64 { 2000 }
fn default_fps() -> u32 { 60 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("{}: {}", path.display(), err);
            None
        }
    }
}

impl Config {
    /// Builds the library configuration. Range checks happen when the
    /// session is constructed; settings are checked here. The threshold
    /// multiplier comes from `[settings] sensitivity` alone.
    pub fn session_config(&self, legacy: bool) -> beatpulse::Result<SessionConfig> {
        let mut dispatcher = if legacy {
            DispatcherConfig::legacy()
        } else {
            DispatcherConfig::default()
        }
        .with_history_size(self.detector.history_size);

        for detector in [&mut dispatcher.bass, &mut dispatcher.mids, &mut dispatcher.overall] {
            if let Some(policy) = self.detector.threshold_policy {
                detector.threshold_policy = policy;
            }
            if let Some(policy) = self.detector.cooldown_policy {
                detector.cooldown_policy = policy;
            }
        }
        dispatcher.factors = BandFactors {
            bass: self.cooldown.bass_factor,
            mids: self.cooldown.mids_factor,
            overall: self.cooldown.overall_factor,
        };
        dispatcher.fallback_cooldown = Duration::from_millis(self.cooldown.fallback_ms);

        let pulse = PulseConfig {
            pulse_gain: self.pulse.pulse_gain,
            decay_factor: self.pulse.decay_factor,
            fade_start_delay: Duration::from_millis(self.pulse.fade_start_delay_ms),
            fade_duration: Duration::from_millis(self.pulse.fade_duration_ms),
        };

        let settings = Settings::new(
            self.settings.sensitivity,
            self.settings.cooldown_multiplier,
            self.settings.max_scale,
            Duration::from_millis(self.settings.animation_duration_ms),
        )?;

        Ok(SessionConfig {
            dispatcher,
            pulse,
            settings,
            mode: self.replay.mode,
        })
    }
}
