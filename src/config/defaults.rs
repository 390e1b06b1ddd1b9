//! System-wide default constants.
//!
//! Non-configurable limits and buffer sizes, grouped by subsystem.

// ============================================================================
// Pipeline
// ============================================================================

/// Consecutive sample-source read errors tolerated before the loop gives up.
///
/// Each failed read is processed as an absence tick. 30 frames is about one
/// second of camera output.
pub const MAX_CONSECUTIVE_SOURCE_ERRORS: u32 = 30;

/// Ticks between progress log lines in the processing loop.
pub const PROGRESS_LOG_INTERVAL_TICKS: u64 = 300;

// ============================================================================
// Dashboard
// ============================================================================

/// Default fatigue history capacity (points).
///
/// 36 000 = 20 minutes at 30 fps.
pub const FATIGUE_HISTORY_CAPACITY: usize = 36_000;

/// Maximum points returned by the fatigue history endpoint in one response.
pub const FATIGUE_HISTORY_MAX_RESPONSE_POINTS: usize = 2_000;

// ============================================================================
// Classifier
// ============================================================================

/// Upper bound on `classifier.slouch_display_decimals`.
pub const MAX_SLOUCH_DISPLAY_DECIMALS: u32 = 9;

// ============================================================================
// Validation warnings
// ============================================================================

/// Tolerance above which posture is practically never flagged.
pub const SUSPICIOUS_TOLERANCE: f64 = 0.5;

/// Absence reset grace above which a warning is emitted (seconds).
pub const SUSPICIOUS_ABSENCE_RESET_SECS: f64 = 600.0;

/// Break duration above which a warning is emitted (seconds).
pub const SUSPICIOUS_BREAK_DURATION_SECS: f64 = 1_800.0;

// ============================================================================
// Simulation
// ============================================================================

/// Base delay between replayed samples at `--speed 1` (milliseconds).
///
/// `delay_ms = SIMULATION_BASE_DELAY_MS / speed`, one camera frame at 30 fps.
pub const SIMULATION_BASE_DELAY_MS: u64 = 33;

/// Nominal frame rate of synthetic sessions (frames per second).
pub const SIMULATION_FRAME_RATE: f64 = 30.0;
