//! Posture Guard: Posture & Fatigue Decision Engine
//!
//! Turns a per-frame geometric posture signal into stabilized posture labels,
//! a running fatigue score and alert intents (beep, sit-straight prompt,
//! break start/stop, session reset).
//!
//! ## Architecture
//!
//! - **Calibrator**: Learns the personal upright baseline and refreshes it
//!   after sustained good posture
//! - **Posture Classifier**: Good / Bad / Calibrating / Unknown per frame
//! - **Fatigue Tracker**: Bad-posture intervals and the 0-100 fatigue score
//! - **Alert State Machine**: Rate-limited beeps, break lifecycle and the
//!   absence watchdog
//! - **Pipeline**: Sources, sinks and the processing loop that drives the
//!   engine and publishes dashboard snapshots

pub mod alerts;
pub mod api;
pub mod calibration;
pub mod classifier;
pub mod config;
pub mod fatigue;
pub mod metrics;
pub mod pipeline;
pub mod sensors;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, MonitorConfig};

// Re-export commonly used types
pub use types::{
    AlertIntents, Classification, FrameSample, GeometricSignal, PostureLabel, TickOutput,
    Timestamp,
};

// Re-export engine components
pub use alerts::{AlertPhase, AlertState, AlertStateMachine};
pub use calibration::{CalibrationState, Calibrator};
pub use classifier::PostureClassifier;
pub use fatigue::{FatigueState, FatigueTracker};
pub use metrics::{FatiguePoint, SessionMetrics, SessionSummary};

// Re-export pipeline
pub use pipeline::{AppState, ProcessingLoop, SessionCoordinator, SessionStats, SystemStatus};
