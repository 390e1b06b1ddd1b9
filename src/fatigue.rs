//! Fatigue tracking: bad-posture time and sitting time → bounded fatigue score

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FatigueConfig;
use crate::types::{PostureLabel, Timestamp};

/// Fatigue bookkeeping for one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatigueState {
    /// When the current session started
    pub session_start: Timestamp,
    /// Start of the open bad-posture interval, if any
    pub bad_posture_since: Option<Timestamp>,
    /// Closed bad-posture intervals, summed
    pub total_bad_seconds: f64,
}

/// Accumulates bad-posture and sitting time into a fatigue score.
///
/// ```text
/// score = min(max_score, floor(bad_total * bad_posture_weight
///                              + session / sitting_seconds_per_point))
/// ```
#[derive(Debug, Clone)]
pub struct FatigueTracker {
    config: FatigueConfig,
    state: FatigueState,
}

impl FatigueTracker {
    pub fn new(config: FatigueConfig, session_start: Timestamp) -> Self {
        Self {
            config,
            state: FatigueState {
                session_start,
                bad_posture_since: None,
                total_bad_seconds: 0.0,
            },
        }
    }

    pub fn state(&self) -> FatigueState {
        self.state
    }

    pub fn session_start(&self) -> Timestamp {
        self.state.session_start
    }

    /// Closed bad-posture time in seconds (excludes the open interval).
    pub fn total_bad_seconds(&self) -> f64 {
        self.state.total_bad_seconds
    }

    /// Open or close the bad-posture interval for this frame's label.
    pub fn update(&mut self, label: PostureLabel, now: Timestamp) {
        match (label, self.state.bad_posture_since) {
            (PostureLabel::Bad, None) => {
                self.state.bad_posture_since = Some(now);
                debug!(at = now, "Bad posture interval opened");
            }
            (PostureLabel::Bad, Some(_)) => {}
            (_, Some(since)) => {
                let interval = elapsed(since, now);
                self.state.total_bad_seconds += interval;
                self.state.bad_posture_since = None;
                debug!(
                    interval,
                    total = self.state.total_bad_seconds,
                    "Bad posture interval closed"
                );
            }
            (_, None) => {}
        }
    }

    /// Whole seconds of the open bad-posture interval, 0 when closed.
    pub fn bad_duration(&self, now: Timestamp) -> u64 {
        self.state
            .bad_posture_since
            .map_or(0, |since| whole_seconds(elapsed(since, now)))
    }

    /// Seconds since the session started.
    pub fn session_seconds(&self, now: Timestamp) -> f64 {
        elapsed(self.state.session_start, now)
    }

    /// Bounded fatigue score.
    pub fn fatigue_score(&self, now: Timestamp) -> u8 {
        let bad_total = self.state.total_bad_seconds + self.bad_duration(now) as f64;
        let score = bad_total * self.config.bad_posture_weight
            + self.session_seconds(now) / self.config.sitting_seconds_per_point;
        let ceiling = self.config.max_score;
        if score >= f64::from(ceiling) {
            ceiling
        } else {
            // 0 <= score < ceiling <= 100, so the cast is exact after floor
            score.floor().max(0.0) as u8
        }
    }
}

/// Elapsed time clamped at zero so clock skew never runs timers backwards.
fn elapsed(since: Timestamp, now: Timestamp) -> f64 {
    (now - since).max(0.0)
}

fn whole_seconds(seconds: f64) -> u64 {
    seconds.floor() as u64
}
