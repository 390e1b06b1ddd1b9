//! Posture classification types

use serde::{Deserialize, Serialize};

/// Discrete posture decision for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PostureLabel {
    /// No body detected in the frame
    #[default]
    Unknown,
    /// Body present but no personal baseline yet
    Calibrating,
    /// Within tolerance of the baseline
    Good,
    /// Leaning forward past the baseline or shoulders tilted
    Bad,
}

impl PostureLabel {
    /// Whether a body was present for this label.
    pub fn is_present(self) -> bool {
        self != Self::Unknown
    }
}

impl std::fmt::Display for PostureLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Calibrating => write!(f, "Calibrating"),
            Self::Good => write!(f, "Good"),
            Self::Bad => write!(f, "Bad"),
        }
    }
}

/// Classifier output for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: PostureLabel,
    /// Forward lean rounded for display (0 when no body was detected)
    pub slouch_value: f64,
    /// Consecutive good frames, carried into the calibrator
    pub stable_good_streak: u32,
}
