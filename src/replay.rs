use anyhow::Context;
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use beatpulse::{BandId, BeatEvent, BeatSession, FeatureSample, PendingTick, RenderFrame, RenderSink, Settings};

/// One line of replay output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputRecord {
    Beat {
        band: BandId,
        intensity: f32,
        scale: f32,
        animation_ms: u64,
        timestamp_ms: f64,
    },
    Frame {
        level: f32,
        fade: f32,
        timestamp_ms: f64,
    },
    Stopped {
        timestamp_ms: f64,
    },
}

#[derive(Debug, Default)]
pub struct Summary {
    pub beats: BTreeMap<BandId, usize>,
    pub manual: usize,
    pub frames: usize,
    pub stops: usize,
}

/// Render sink that records everything it is asked to draw.
#[derive(Debug, Default)]
pub struct EventLog {
    clock: Duration,
    pub records: Vec<OutputRecord>,
    pub summary: Summary,
}

impl EventLog {
    pub fn write_json_lines<W: Write>(&self, mut out: W) -> anyhow::Result<()> {
        for record in &self.records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Converts `--manual-beats` milliseconds into stream offsets.
pub fn manual_beat_times(millis: &[f64]) -> anyhow::Result<Vec<Duration>> {
    millis
        .iter()
        .map(|&ms| {
            Duration::try_from_secs_f64(ms / 1000.0)
                .with_context(|| format!("manual beat time {} ms is not a usable stream offset", ms))
        })
        .collect()
}

fn millis(t: Duration) -> f64 {
    t.as_secs_f64() * 1000.0
}

impl RenderSink for EventLog {
    fn paint_background(&mut self, frame: &RenderFrame) {
        self.summary.frames += 1;
        self.records.push(OutputRecord::Frame {
            level: frame.level,
            fade: frame.fade,
            timestamp_ms: millis(frame.at),
        });
    }

    fn clear_background(&mut self) {
        self.summary.stops += 1;
        self.records.push(OutputRecord::Stopped {
            timestamp_ms: millis(self.clock),
        });
    }

    fn spawn_shape(&mut self, event: &BeatEvent, at: Duration, settings: &Settings) {
        *self.summary.beats.entry(event.band).or_default() += 1;
        self.records.push(OutputRecord::Beat {
            band: event.band,
            intensity: event.intensity,
            scale: settings.shape_scale(event.intensity),
            animation_ms: settings.animation_duration().as_millis() as u64,
            timestamp_ms: millis(at),
        });
    }
}

/// Drives a session through a recorded stream on a simulated frame clock.
///
/// Tick requests from the pulse engine are honoured every `1/fps` of stream
/// time. Once the stream is exhausted, outstanding ticks run until the
/// engine stops itself.
pub struct Replay<'a> {
    session: &'a mut BeatSession<PendingTick>,
    log: &'a mut EventLog,
    interval: Duration,
    next_frame: Option<Duration>,
}

impl<'a> Replay<'a> {
    pub fn new(session: &'a mut BeatSession<PendingTick>, log: &'a mut EventLog, fps: u32) -> Self {
        Self {
            session,
            log,
            interval: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            next_frame: None,
        }
    }

    pub fn run(
        &mut self,
        samples: &[FeatureSample],
        manual_beats: &[Duration],
        progress: Option<&ProgressBar>,
    ) {
        let mut manual = manual_beats.to_vec();
        manual.sort();
        let mut manual = manual.into_iter().peekable();

        for sample in samples {
            while let Some(at) = manual.next_if(|&at| at <= sample.timestamp) {
                self.manual_beat(at);
            }
            self.advance(sample.timestamp);
            self.log.clock = sample.timestamp;
            self.session.on_sample(sample, &mut *self.log);
            self.arm(sample.timestamp);
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        for at in manual {
            self.manual_beat(at);
        }
        self.advance(Duration::MAX);
    }

    fn manual_beat(&mut self, at: Duration) {
        self.advance(at);
        self.log.clock = at;
        self.session.manual_trigger(at, &mut *self.log);
        self.log.summary.manual += 1;
        self.arm(at);
    }

    /// Starts the frame clock if the engine just asked for its first tick.
    fn arm(&mut self, now: Duration) {
        if self.next_frame.is_none() && self.session.engine().scheduler().is_pending() {
            self.next_frame = Some(now + self.interval);
        }
    }

    /// Runs every requested tick due at or before `until`.
    fn advance(&mut self, until: Duration) {
        while let Some(at) = self.next_frame {
            if at > until {
                break;
            }
            if !self.session.engine_mut().scheduler_mut().take() {
                self.next_frame = None;
                break;
            }
            self.log.clock = at;
            self.session.tick(at, &mut *self.log);
            self.next_frame = self
                .session
                .engine()
                .scheduler()
                .is_pending()
                .then(|| at + self.interval);
        }
    }
}
