//! Frame ingestion types: GeometricSignal, FrameSample, Timestamp

use serde::{Deserialize, Serialize};

/// Wall-clock time in seconds (fractional).
///
/// All timers in the engine are expressed in this unit. Samples carry their own
/// timestamp so replays and tests can fast-forward time deterministically.
pub type Timestamp = f64;

/// Current wall-clock time as a [`Timestamp`].
pub fn wall_clock_now() -> Timestamp {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

// ============================================================================
// Geometric Signal
// ============================================================================

/// Per-frame scalar pair derived from body landmarks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometricSignal {
    /// Signed vertical offset between the head reference point and the
    /// shoulder midpoint. Larger values mean the head has dropped forward.
    pub forward_lean: f64,
    /// Unsigned vertical difference between the left and right shoulder.
    pub shoulder_tilt: f64,
}

impl GeometricSignal {
    pub fn new(forward_lean: f64, shoulder_tilt: f64) -> Self {
        Self {
            forward_lean,
            shoulder_tilt,
        }
    }

    /// Both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.forward_lean.is_finite() && self.shoulder_tilt.is_finite()
    }
}

// ============================================================================
// Frame Sample
// ============================================================================

/// One frame's worth of input from the pose-estimation collaborator.
///
/// When `body_detected` is false the signal carries no meaning and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    /// Capture time of the frame
    pub timestamp: Timestamp,
    /// Whether a body was found in the frame
    pub body_detected: bool,
    /// Geometric signal (zeroed when no body was detected)
    #[serde(flatten)]
    pub signal: GeometricSignal,
}

impl FrameSample {
    /// A frame with a detected body.
    pub fn present(timestamp: Timestamp, forward_lean: f64, shoulder_tilt: f64) -> Self {
        Self {
            timestamp,
            body_detected: true,
            signal: GeometricSignal::new(forward_lean, shoulder_tilt),
        }
    }

    /// A frame with nobody in view.
    pub fn absent(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            body_detected: false,
            signal: GeometricSignal::default(),
        }
    }

    /// Whether the sample carries a usable body signal.
    ///
    /// Non-finite landmark output is treated the same as a missing body.
    pub fn has_body(&self) -> bool {
        self.body_detected && self.signal.is_finite()
    }
}
