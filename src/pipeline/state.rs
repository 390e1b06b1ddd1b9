//! Application State and System Status
//!
//! Snapshot of the monitoring session published by the processing loop and
//! read by the dashboard API handlers.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::alerts::AlertState;
use crate::calibration::CalibrationState;
use crate::metrics::{FatiguePoint, SessionSummary};
use crate::types::{PostureLabel, TickOutput};

use super::SessionStats;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state accessible from API handlers and the processing loop.
///
/// This struct is wrapped in `Arc<RwLock<>>` for thread-safe access across
/// the async runtime. Only the processing loop writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// System uptime (serializes as seconds via `uptime_secs`)
    #[serde(skip, default = "Instant::now")]
    pub uptime: Instant,

    /// Session / workstation name from config
    pub session_name: String,

    /// Current system status
    pub status: SystemStatus,

    /// Name of the active sample source
    pub source: Option<String>,

    /// Wall-clock time of the last published frame
    pub last_update: Option<chrono::DateTime<chrono::Utc>>,

    /// Latest frame result
    pub latest_tick: Option<TickOutput>,

    /// Calibrator snapshot
    pub calibration: CalibrationState,

    /// Alert state machine snapshot
    pub alerts: Option<AlertState>,

    /// Dashboard summary as of the latest frame
    pub summary: Option<SessionSummary>,

    /// Processing statistics
    pub stats: SessionStats,

    /// Fatigue chart points (bounded by `fatigue_history_capacity`)
    #[serde(skip)]
    pub fatigue_history: VecDeque<FatiguePoint>,

    /// Capacity of `fatigue_history`
    #[serde(skip)]
    pub fatigue_history_capacity: usize,
}

impl Default for AppState {
    /// Returns a deterministic zero-value suitable for tests.
    fn default() -> Self {
        Self::new("workstation", crate::config::defaults::FATIGUE_HISTORY_CAPACITY)
    }
}

impl AppState {
    pub fn new(session_name: impl Into<String>, fatigue_history_capacity: usize) -> Self {
        Self {
            uptime: Instant::now(),
            session_name: session_name.into(),
            status: SystemStatus::Initializing,
            source: None,
            last_update: None,
            latest_tick: None,
            calibration: CalibrationState::default(),
            alerts: None,
            summary: None,
            stats: SessionStats::default(),
            fatigue_history: VecDeque::new(),
            fatigue_history_capacity: fatigue_history_capacity.max(1),
        }
    }

    /// Append one chart point, dropping the oldest when full.
    pub fn push_fatigue_point(&mut self, point: FatiguePoint) {
        if self.fatigue_history.len() >= self.fatigue_history_capacity {
            self.fatigue_history.pop_front();
        }
        self.fatigue_history.push_back(point);
    }

    /// Most recent `limit` chart points, oldest first.
    pub fn recent_fatigue_history(&self, limit: usize) -> Vec<FatiguePoint> {
        let skip = self.fatigue_history.len().saturating_sub(limit);
        self.fatigue_history.iter().skip(skip).copied().collect()
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.uptime.elapsed().as_secs()
    }
}

/// System operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemStatus {
    /// Waiting for the first frame
    Initializing,
    /// Learning the personal baseline
    Calibrating,
    /// Calibrated and classifying posture
    Monitoring,
    /// Nobody in front of the camera
    Away,
    /// Source exhausted or shutdown requested
    Stopped,
    /// Source failed permanently
    Error,
}

impl SystemStatus {
    /// Status implied by a frame's label.
    pub fn from_label(label: PostureLabel) -> Self {
        match label {
            PostureLabel::Unknown => Self::Away,
            PostureLabel::Calibrating => Self::Calibrating,
            PostureLabel::Good | PostureLabel::Bad => Self::Monitoring,
        }
    }
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "Initializing"),
            Self::Calibrating => write!(f, "Calibrating"),
            Self::Monitoring => write!(f, "Monitoring"),
            Self::Away => write!(f, "Away"),
            Self::Stopped => write!(f, "Stopped"),
            Self::Error => write!(f, "Error"),
        }
    }
}
