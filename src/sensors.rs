//! Frame ingestion from CSV files and JSON lines, plus synthetic sessions

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::config::defaults::SIMULATION_FRAME_RATE;
use crate::types::{FrameSample, Timestamp};

/// Errors from decoding a single frame record.
#[derive(Debug, Error)]
pub enum SampleParseError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected 4 fields, got {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: cannot parse {field} from '{value}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame reports a body but has no {0}")]
    MissingSignal(&'static str),
}

// ============================================================================
// JSON frame records
// ============================================================================

/// Loosely-typed frame as emitted by the pose-estimation collaborator.
///
/// `timestamp` may be omitted (stamped with the wall clock on arrival).
/// `body_detected` may be omitted, in which case a body is assumed when both
/// signal components are present.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameRecord {
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub body_detected: Option<bool>,
    #[serde(default)]
    pub forward_lean: Option<f64>,
    #[serde(default)]
    pub shoulder_tilt: Option<f64>,
}

impl FrameRecord {
    /// Resolve into a sample, using `arrival` when the record has no timestamp.
    pub fn into_sample(self, arrival: Timestamp) -> Result<FrameSample, SampleParseError> {
        let timestamp = self.timestamp.unwrap_or(arrival);
        let body_detected = self
            .body_detected
            .unwrap_or(self.forward_lean.is_some() && self.shoulder_tilt.is_some());

        if !body_detected {
            return Ok(FrameSample::absent(timestamp));
        }

        let forward_lean = self
            .forward_lean
            .ok_or(SampleParseError::MissingSignal("forward_lean"))?;
        let shoulder_tilt = self
            .shoulder_tilt
            .ok_or(SampleParseError::MissingSignal("shoulder_tilt"))?;
        Ok(FrameSample::present(timestamp, forward_lean, shoulder_tilt))
    }
}

/// Parse one JSON line into a sample.
pub fn parse_json_frame(line: &str, arrival: Timestamp) -> Result<FrameSample, SampleParseError> {
    serde_json::from_str::<FrameRecord>(line)?.into_sample(arrival)
}

// ============================================================================
// CSV
// ============================================================================

/// Read recorded frames from a CSV file.
///
/// Expected CSV format (header optional):
/// timestamp,body_detected,forward_lean,shoulder_tilt
///
/// `timestamp` is epoch seconds (fractional allowed) or RFC 3339. Signal
/// fields may be empty on rows without a body. Malformed rows are skipped.
pub fn read_csv_samples(path: &Path) -> Result<Vec<FrameSample>, SampleParseError> {
    let file = File::open(path).map_err(|source| SampleParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let reader = BufReader::new(file);
    let mut samples = Vec::new();

    for (index, line_result) in reader.lines().enumerate() {
        let line_num = index + 1;

        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(line = line_num, error = %e, "Error reading CSV line");
                continue;
            }
        };

        // Skip header line
        if line_num == 1 && line.trim_start().starts_with("timestamp") {
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        match parse_csv_line(&line, line_num) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                tracing::warn!(line = line_num, error = %e, "Error parsing CSV line");
            }
        }
    }

    tracing::info!(count = samples.len(), path = %path.display(), "Loaded frames from CSV");
    Ok(samples)
}

/// Parse a single CSV line into a FrameSample
fn parse_csv_line(line: &str, line_num: usize) -> Result<FrameSample, SampleParseError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    if fields.len() != 4 {
        return Err(SampleParseError::FieldCount {
            line: line_num,
            found: fields.len(),
        });
    }

    let timestamp = parse_timestamp(fields[0]).ok_or_else(|| invalid(line_num, "timestamp", fields[0]))?;
    let body_detected =
        parse_flag(fields[1]).ok_or_else(|| invalid(line_num, "body_detected", fields[1]))?;

    if !body_detected {
        return Ok(FrameSample::absent(timestamp));
    }

    let forward_lean = parse_f64(fields[2]).ok_or_else(|| invalid(line_num, "forward_lean", fields[2]))?;
    let shoulder_tilt =
        parse_f64(fields[3]).ok_or_else(|| invalid(line_num, "shoulder_tilt", fields[3]))?;

    Ok(FrameSample::present(timestamp, forward_lean, shoulder_tilt))
}

fn invalid(line: usize, field: &'static str, value: &str) -> SampleParseError {
    SampleParseError::InvalidField {
        line,
        field,
        value: value.to_string(),
    }
}

/// Parse epoch seconds or an RFC 3339 timestamp into fractional seconds
fn parse_timestamp(s: &str) -> Option<Timestamp> {
    if let Some(epoch) = parse_f64(s) {
        return Some(epoch);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis() as f64 / 1000.0)
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ============================================================================
// Synthetic session
// ============================================================================

/// Phases of the synthetic session, in seconds at 30 fps.
const SYNTHETIC_PHASES: &[(SyntheticPhase, f64)] = &[
    (SyntheticPhase::Upright, 3.0),   // calibration
    (SyntheticPhase::Upright, 10.0),  // good posture
    (SyntheticPhase::Slouched, 40.0), // long slouch: beeps, then a break
    (SyntheticPhase::Upright, 10.0),  // recovery
    (SyntheticPhase::Away, 7.0),      // absence past the reset timeout
    (SyntheticPhase::Upright, 5.0),   // return and recalibrate
];

#[derive(Debug, Clone, Copy)]
enum SyntheticPhase {
    Upright,
    Slouched,
    Away,
}

const UPRIGHT_LEAN: f64 = 0.10;
const SLOUCHED_LEAN: f64 = 0.20;

/// Generate a deterministic synthetic session starting at `start`.
///
/// Walks through calibration, good posture, a sustained slouch long enough
/// to trigger beeps and a break, recovery, an absence that resets the
/// session, and the return.
pub fn generate_session_data(start: Timestamp) -> Vec<FrameSample> {
    let frame_interval = 1.0 / SIMULATION_FRAME_RATE;
    let mut samples = Vec::new();
    let mut frame = 0u32;

    for &(phase, seconds) in SYNTHETIC_PHASES {
        let frames = (seconds * SIMULATION_FRAME_RATE).round() as u32;
        for _ in 0..frames {
            let t = start + f64::from(frame) * frame_interval;
            // Small deterministic sway so the signal is not perfectly flat
            let sway = (f64::from(frame) * 0.2).sin() * 0.005;
            let sample = match phase {
                SyntheticPhase::Upright => FrameSample::present(t, UPRIGHT_LEAN + sway, 0.01),
                SyntheticPhase::Slouched => FrameSample::present(t, SLOUCHED_LEAN + sway, 0.02),
                SyntheticPhase::Away => FrameSample::absent(t),
            };
            samples.push(sample);
            frame += 1;
        }
    }

    tracing::debug!(count = samples.len(), "Generated synthetic posture session");
    samples
}
