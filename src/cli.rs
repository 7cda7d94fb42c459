use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "beatpulse", about = "Replay a recorded feature stream through the beat detector")]
pub struct Cli {
    /// Feature stream (JSON lines: band, value, timestamp_ms)
    pub input: PathBuf,

    /// Write events here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file (defaults to beatpulse.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Tempo of the recording in BPM. Without it the fallback cooldown is used.
    #[arg(long)]
    pub bpm: Option<f32>,

    /// Threshold multiplier (higher = fewer beats)
    #[arg(short, long)]
    pub sensitivity: Option<f32>,

    /// Cooldown multiplier (higher = fewer beats per second)
    #[arg(long)]
    pub cooldown_multiplier: Option<f32>,

    /// Rolling window length per band, in samples
    #[arg(long)]
    pub history_size: Option<usize>,

    /// Filter mode: full, bass or mids
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Animation frames per second for the pulse loop
    #[arg(long)]
    pub fps: Option<u32>,

    /// Stream times (ms) at which to fire a manual beat
    #[arg(long, value_delimiter = ',')]
    pub manual_beats: Vec<f64>,

    /// Use the mean-scaled threshold on every band
    #[arg(long)]
    pub legacy: bool,
}
