use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::time::Duration;

use crate::detect::{BandId, FeatureSample};

/// On-disk form of one feature sample (one JSON object per line).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub band: BandId,
    pub value: f32,
    pub timestamp_ms: f64,
}

impl SampleRecord {
    /// Rejects negative or non-finite values, and timestamps that do not
    /// fit a `Duration`.
    pub fn into_sample(self) -> Option<FeatureSample> {
        if !(self.value.is_finite() && self.value >= 0.0) {
            return None;
        }
        let timestamp = Duration::try_from_secs_f64(self.timestamp_ms / 1000.0).ok()?;
        Some(FeatureSample::new(self.band, self.value, timestamp))
    }
}

impl From<&FeatureSample> for SampleRecord {
    fn from(sample: &FeatureSample) -> Self {
        Self {
            band: sample.band,
            value: sample.value,
            timestamp_ms: sample.timestamp.as_secs_f64() * 1000.0,
        }
    }
}

/// Reads a JSON-lines feature stream.
///
/// Blank lines and lines starting with `#` are ignored. Lines that do not
/// parse, or carry out-of-range numbers, are skipped with a warning. The
/// result is ordered by timestamp; samples sharing a timestamp keep their
/// file order.
pub fn read_samples<R: BufRead>(reader: R) -> std::io::Result<Vec<FeatureSample>> {
    let mut samples = Vec::new();
    let mut skipped = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<SampleRecord>(trimmed) {
            Ok(record) => match record.into_sample() {
                Some(sample) => samples.push(sample),
                None => {
                    skipped += 1;
                    log::warn!("line {}: value or timestamp out of range, skipped", idx + 1);
                }
            },
            Err(err) => {
                skipped += 1;
                log::warn!("line {}: {}, skipped", idx + 1, err);
            }
        }
    }

    samples.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    if skipped > 0 {
        log::warn!("skipped {} malformed sample(s)", skipped);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_and_orders_samples() {
        let input = r#"
# recorded at 44.1kHz / 1024
{"band":"bass","value":0.4,"timestamp_ms":250.0}
{"band":"overall","value":0.9,"timestamp_ms":125.0}
{"band":"mids","value":0.1,"timestamp_ms":125.0}
"#;
        let samples = read_samples(Cursor::new(input)).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].band, BandId::Overall);
        assert_eq!(samples[1].band, BandId::Mids);
        assert_eq!(samples[2].band, BandId::Bass);
        assert_eq!(samples[2].timestamp, Duration::from_millis(250));
    }

    #[test]
    fn skips_malformed_lines() {
        let input = concat!(
            "{\"band\":\"bass\",\"value\":0.4,\"timestamp_ms\":10}\n",
            "not json\n",
            "{\"band\":\"treble\",\"value\":0.4,\"timestamp_ms\":20}\n",
            "{\"band\":\"bass\",\"value\":-1.0,\"timestamp_ms\":30}\n",
            "{\"band\":\"bass\",\"value\":1.0,\"timestamp_ms\":1e300}\n",
            "{\"band\":\"bass\",\"value\":1.0,\"timestamp_ms\":-5}\n",
            "{\"band\":\"mids\",\"value\":0.2,\"timestamp_ms\":40}\n",
        );
        let samples = read_samples(Cursor::new(input)).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].band, BandId::Mids);
    }

    #[test]
    fn record_round_trip_keeps_band() {
        let sample = FeatureSample::new(BandId::Mids, 0.25, Duration::from_millis(500));
        let record = SampleRecord::from(&sample);
        assert_eq!(record.timestamp_ms, 500.0);
        assert_eq!(record.into_sample(), Some(sample));
    }
}
