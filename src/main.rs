mod cli;
mod config;
mod replay;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::time::Duration;

use beatpulse::{BeatSession, FilterMode, KnownTempo, PendingTick};
use cli::Cli;
use replay::{EventLog, Replay};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Explicit --config path, or auto-detect beatpulse.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("beatpulse.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("beatpulse").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("beatpulse").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut cfg = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                config::Config::default()
            }
        },
        None => config::Config::default(),
    };

    // Command-line values win over the config file
    if let Some(history_size) = cli.history_size {
        cfg.detector.history_size = history_size;
    }
    if let Some(sensitivity) = cli.sensitivity {
        cfg.settings.sensitivity = sensitivity;
    }
    if let Some(multiplier) = cli.cooldown_multiplier {
        cfg.settings.cooldown_multiplier = multiplier;
    }
    if let Some(fps) = cli.fps {
        cfg.replay.fps = fps;
    }
    if let Some(ref mode) = cli.mode {
        cfg.replay.mode = mode.parse::<FilterMode>()?;
    }
    if cfg.replay.fps == 0 {
        anyhow::bail!("fps must be at least 1");
    }
    let manual = replay::manual_beat_times(&cli.manual_beats)?;

    let session_config = cfg
        .session_config(cli.legacy)
        .context("Invalid detector configuration")?;
    let mut session = BeatSession::new(session_config, PendingTick::new())
        .context("Invalid detector configuration")?;

    log::info!("beatpulse - adaptive multi-band beat detection");
    log::info!("Input: {}", cli.input.display());
    log::info!(
        "Mode: {:?}, sensitivity {:.2}, cooldown x{:.2}, history {} samples, {} fps",
        session.mode(),
        session.settings().sensitivity(),
        session.settings().cooldown_multiplier(),
        cfg.detector.history_size,
        cfg.replay.fps
    );

    // 1. Load feature stream
    let file = File::open(&cli.input)
        .with_context(|| format!("Failed to open feature stream: {}", cli.input.display()))?;
    let samples = beatpulse::stream::read_samples(BufReader::new(file))
        .with_context(|| format!("Failed to read feature stream: {}", cli.input.display()))?;
    if samples.is_empty() && cli.manual_beats.is_empty() {
        anyhow::bail!("No usable samples in {}", cli.input.display());
    }
    let duration = samples.last().map_or(Duration::ZERO, |s| s.timestamp);
    log::info!("Samples: {}, Duration: {:.1}s", samples.len(), duration.as_secs_f32());

    // 2. Replay
    let mut events = EventLog::default();
    session.start(&mut KnownTempo(cli.bpm));

    let pb = ProgressBar::new(samples.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} samples ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    Replay::new(&mut session, &mut events, cfg.replay.fps).run(&samples, &manual, Some(&pb));
    pb.finish_with_message("Replay complete");
    session.stop(&mut events);

    // 3. Write events
    match cli.output {
        Some(ref path) => {
            let out = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            events.write_json_lines(BufWriter::new(out))?;
            log::info!("Wrote {} records to {}", events.records.len(), path.display());
        }
        None => events.write_json_lines(std::io::stdout().lock())?,
    }

    for (band, count) in &events.summary.beats {
        log::info!("{:>8}: {} beats", band.as_str(), count);
    }
    log::info!(
        "Manual triggers: {}, frames: {}, loop stops: {}",
        events.summary.manual,
        events.summary.frames,
        events.summary.stops
    );
    Ok(())
}
