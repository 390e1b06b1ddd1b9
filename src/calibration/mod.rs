//! Personal Posture Baseline - Calibration & Re-baselining
//!
//! Everyone sits differently, so "leaning forward" is judged against a
//! per-user reference lean captured from the first stretch of frames in
//! which a body is visible.
//!
//! ## Architecture
//!
//! - `CalibrationState`: baseline, calibration progress and good-posture streak
//! - `Calibrator`: owns the state and applies one transition per frame
//!
//! ## Lifecycle
//!
//! 1. **Calibrating**: body-detected frames are counted. Once the count exceeds
//!    `calibration_samples`, the current frame's forward lean becomes the baseline.
//! 2. **Calibrated**: the classifier maintains a streak of consecutive good
//!    frames. Once the streak exceeds `rebaseline_good_streak`, the baseline is
//!    re-captured from the current frame and the streak restarts.
//! 3. **Reset**: an absence timeout discards everything and calibration starts over.
//!
//! ## Usage
//!
//! ```ignore
//! let mut calibrator = Calibrator::new(config.calibration.clone());
//!
//! // Per frame, after classification:
//! calibrator.record_streak(classification.stable_good_streak);
//! let baseline = calibrator.calibrate(&sample.signal, sample.has_body());
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CalibrationConfig;
use crate::types::GeometricSignal;

// ============================================================================
// Calibration State
// ============================================================================

/// Snapshot of the calibrator, also published on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    /// Reference forward lean, `None` until calibration completes
    pub baseline: Option<f64>,
    /// Body-detected frames seen while uncalibrated (frozen once calibrated)
    pub calibration_sample_count: u32,
    /// Consecutive good frames since the last bad frame or re-baseline
    pub stable_good_streak: u32,
    /// Number of times the baseline was re-captured this session
    pub rebaseline_count: u32,
}

impl CalibrationState {
    pub fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }
}

// ============================================================================
// Calibrator
// ============================================================================

/// Owns the calibration state for one session.
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
    state: CalibrationState,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            state: CalibrationState::default(),
        }
    }

    /// Current baseline, if calibrated.
    pub fn baseline(&self) -> Option<f64> {
        self.state.baseline
    }

    /// Good-posture streak to hand to the classifier.
    pub fn stable_good_streak(&self) -> u32 {
        self.state.stable_good_streak
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Store the streak returned by the classifier for this frame.
    pub fn record_streak(&mut self, streak: u32) {
        self.state.stable_good_streak = streak;
    }

    /// Apply one frame to the calibration state and return the baseline.
    ///
    /// Frames without a body make no progress.
    pub fn calibrate(&mut self, signal: &GeometricSignal, body_detected: bool) -> Option<f64> {
        if !body_detected {
            return self.state.baseline;
        }

        match self.state.baseline {
            None => {
                self.state.calibration_sample_count += 1;
                if self.state.calibration_sample_count > self.config.calibration_samples {
                    self.state.baseline = Some(signal.forward_lean);
                    info!(
                        baseline = signal.forward_lean,
                        samples = self.state.calibration_sample_count,
                        "Posture baseline captured"
                    );
                } else {
                    debug!(
                        progress = self.state.calibration_sample_count,
                        window = self.config.calibration_samples,
                        "Calibrating"
                    );
                }
            }
            Some(previous) => {
                if self.state.stable_good_streak > self.config.rebaseline_good_streak {
                    self.state.baseline = Some(signal.forward_lean);
                    self.state.stable_good_streak = 0;
                    self.state.rebaseline_count += 1;
                    info!(
                        previous,
                        baseline = signal.forward_lean,
                        rebaselines = self.state.rebaseline_count,
                        "Posture baseline refreshed after sustained good posture"
                    );
                }
            }
        }

        self.state.baseline
    }

    /// Discard the baseline and start calibrating again.
    pub fn reset(&mut self) {
        self.state = CalibrationState::default();
    }
}
