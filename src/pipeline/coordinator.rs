//! Session Coordinator - per-frame decision sequence
//!
//! Runs one frame through every stage of the decision engine:
//!
//! ```text
//! STAGE 1: Classify     (signal + current baseline + streak → label)
//! STAGE 2: Calibrate    (capture or refresh the personal baseline)
//! STAGE 3: Fatigue      (open/close the bad interval, score)
//! STAGE 4: Dashboard    (posture split, fatigue history)
//! STAGE 5: Alerts       (beep / break / absence watchdog)
//! STAGE 6: Reset        (fresh fatigue + calibration after absence timeout)
//! ```
//!
//! The coordinator exclusively owns all session state; one frame is fully
//! processed before the next.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::alerts::{AlertState, AlertStateMachine};
use crate::calibration::{CalibrationState, Calibrator};
use crate::classifier::PostureClassifier;
use crate::config::{ConfigError, MonitorConfig};
use crate::fatigue::{FatigueState, FatigueTracker};
use crate::metrics::{FatiguePoint, SessionMetrics, SessionSummary};
use crate::types::{FrameSample, PostureLabel, TickOutput, Timestamp};

/// Session Coordinator owns the calibrator, classifier, fatigue tracker,
/// alert state machine and dashboard counters for one monitoring run.
#[derive(Debug)]
pub struct SessionCoordinator {
    config: MonitorConfig,
    /// Stage 1
    classifier: PostureClassifier,
    /// Stage 2
    calibrator: Calibrator,
    /// Stage 3 (replaced on absence reset)
    fatigue: FatigueTracker,
    /// False until the first frame fixes the session start
    session_anchored: bool,
    /// Stage 4
    metrics: SessionMetrics,
    /// Stage 5
    alerts: AlertStateMachine,
    /// Latest frame result
    latest: Option<TickOutput>,
    /// Fatigue chart point for the latest frame
    latest_point: Option<FatiguePoint>,
    /// Statistics
    samples_processed: u64,
    absent_samples: u64,
    beeps: u64,
    breaks_started: u64,
    session_resets: u64,
}

impl SessionCoordinator {
    /// Validate the config and start a session at `session_start`.
    pub fn new(config: MonitorConfig, session_start: Timestamp) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            session = %config.session.name,
            calibration_samples = config.calibration.calibration_samples,
            "Initializing session coordinator"
        );

        Ok(Self {
            classifier: PostureClassifier::new(config.classifier.clone()),
            calibrator: Calibrator::new(config.calibration.clone()),
            fatigue: FatigueTracker::new(config.fatigue.clone(), session_start),
            session_anchored: true,
            metrics: SessionMetrics::default(),
            alerts: AlertStateMachine::new(config.alerts.clone()),
            config,
            latest: None,
            latest_point: None,
            samples_processed: 0,
            absent_samples: 0,
            beeps: 0,
            breaks_started: 0,
            session_resets: 0,
        })
    }

    /// Start the session at the timestamp of the first processed frame.
    ///
    /// Used for live and recorded streams whose clock is only known once the
    /// first frame arrives.
    pub fn starting_at_first_frame(config: MonitorConfig) -> Result<Self, ConfigError> {
        let mut coordinator = Self::new(config, 0.0)?;
        coordinator.session_anchored = false;
        Ok(coordinator)
    }

    /// Process one frame through all stages.
    ///
    /// Fatigue figures in the output are computed before an absence reset
    /// takes effect, so the reset frame still shows the outgoing session.
    pub fn process_sample(&mut self, sample: &FrameSample) -> TickOutput {
        let now = sample.timestamp;
        let body_detected = sample.has_body();

        if !self.session_anchored {
            self.fatigue = FatigueTracker::new(self.config.fatigue.clone(), now);
            self.session_anchored = true;
            debug!(session_start = now, "Session anchored on first frame");
        }

        // Stage 1: classify against the baseline as it stood before this frame
        let classification = self.classifier.classify(
            &sample.signal,
            body_detected,
            self.calibrator.baseline(),
            self.calibrator.stable_good_streak(),
        );
        let label = classification.label;

        // Stage 2: calibration / re-baseline
        self.calibrator.record_streak(classification.stable_good_streak);
        let baseline = self.calibrator.calibrate(&sample.signal, body_detected);

        // Stage 3: fatigue
        self.fatigue.update(label, now);
        let bad_duration_secs = self.fatigue.bad_duration(now);
        let fatigue_score = self.fatigue.fatigue_score(now);

        // Stage 4: dashboard counters
        self.metrics.record_frame(label);
        self.latest_point = Some(FatiguePoint {
            elapsed_seconds: self.fatigue.session_seconds(now),
            fatigue_score,
        });

        // Stage 5: alerts
        let intents = self
            .alerts
            .tick(label, fatigue_score, bad_duration_secs, now);
        self.metrics.record_alerts(&intents);

        // Stage 6: absence reset, re-anchored on every frame past the timeout
        if self.alerts.absence_expired(now) {
            self.fatigue = FatigueTracker::new(self.config.fatigue.clone(), now);
            self.calibrator.reset();
        }

        self.samples_processed += 1;
        if label == PostureLabel::Unknown {
            self.absent_samples += 1;
        }
        self.beeps += u64::from(intents.beep);
        self.breaks_started += u64::from(intents.break_start);
        self.session_resets += u64::from(intents.session_reset);

        let output = TickOutput {
            timestamp: now,
            label,
            slouch_value: classification.slouch_value,
            baseline,
            bad_duration_secs,
            fatigue_score,
            intents,
        };
        debug!(
            %label,
            slouch = output.slouch_value,
            bad_duration_secs,
            fatigue_score,
            "Frame processed"
        );
        self.latest = Some(output);
        output
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn latest(&self) -> Option<&TickOutput> {
        self.latest.as_ref()
    }

    pub fn latest_fatigue_point(&self) -> Option<FatiguePoint> {
        self.latest_point
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibrator.state()
    }

    pub fn fatigue_state(&self) -> FatigueState {
        self.fatigue.state()
    }

    pub fn alert_state(&self) -> &AlertState {
        self.alerts.state()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// Dashboard summary as of `now`.
    pub fn summary(&self, now: Timestamp) -> SessionSummary {
        self.metrics.summary(
            self.fatigue.fatigue_score(now),
            self.fatigue.session_seconds(now),
            self.fatigue.total_bad_seconds(),
        )
    }

    /// Get processing statistics
    pub fn get_stats(&self) -> SessionStats {
        SessionStats {
            samples_processed: self.samples_processed,
            absent_samples: self.absent_samples,
            beeps: self.beeps,
            breaks_started: self.breaks_started,
            session_resets: self.session_resets,
            rebaselines: self.calibrator.state().rebaseline_count,
        }
    }
}

/// Processing statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub samples_processed: u64,
    pub absent_samples: u64,
    pub beeps: u64,
    pub breaks_started: u64,
    pub session_resets: u64,
    /// Re-baselines in the current calibration (cleared by a session reset)
    pub rebaselines: u32,
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Session: {} frames ({} absent), {} beeps, {} breaks, {} resets",
            self.samples_processed,
            self.absent_samples,
            self.beeps,
            self.breaks_started,
            self.session_resets
        )
    }
}
