//! Alert intents and per-tick output

use serde::{Deserialize, Serialize};

use super::{PostureLabel, Timestamp};

/// Notification directives produced by one alert state machine tick.
///
/// The state machine never plays sound itself; the caller dispatches these
/// to a notification sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertIntents {
    /// Play a single short beep
    pub beep: bool,
    /// Show the "sit straight" prompt (bad posture past the grace period)
    pub sit_straight: bool,
    /// Start looping break playback
    pub break_start: bool,
    /// A break is in progress, show the "take a break" prompt
    pub break_continue: bool,
    /// Stop break playback
    pub break_stop: bool,
    /// Absence timeout elapsed: discard fatigue and calibration state
    pub session_reset: bool,
}

impl AlertIntents {
    /// Whether any audible or visible notification is requested.
    pub fn any(&self) -> bool {
        self.beep
            || self.sit_straight
            || self.break_start
            || self.break_continue
            || self.break_stop
            || self.session_reset
    }
}

/// Everything a renderer, sink or dashboard needs about one processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    /// Frame timestamp
    pub timestamp: Timestamp,
    /// Stabilised posture label
    pub label: PostureLabel,
    /// Rounded forward lean for display
    pub slouch_value: f64,
    /// Current personal baseline, if calibrated
    pub baseline: Option<f64>,
    /// Whole seconds of the ongoing bad-posture stretch
    pub bad_duration_secs: u64,
    /// Bounded fatigue score
    pub fatigue_score: u8,
    /// Notification directives for this frame
    #[serde(flatten)]
    pub intents: AlertIntents,
}

impl TickOutput {
    /// On-screen prompt for this frame, break prompt taking precedence.
    pub fn prompt(&self) -> Option<&'static str> {
        if self.intents.break_continue {
            Some("Take a Break!")
        } else if self.intents.sit_straight {
            Some("Sit Straight!")
        } else {
            None
        }
    }
}
