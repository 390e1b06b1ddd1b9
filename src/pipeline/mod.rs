//! Processing Pipeline Module
//!
//! ## Per-frame flow
//!
//! ```text
//! SampleSource ──▶ SessionCoordinator ──▶ NotificationSink(s)
//!  (replay/stdin)   classify → calibrate      (console, JSON)
//!                   → fatigue → alerts
//!                          │
//!                          ▼
//!                 Arc<RwLock<AppState>> ──▶ dashboard API
//! ```
//!
//! One frame is fully processed before the next is read. The coordinator is
//! owned by the processing loop task; the API only sees published snapshots.

mod state;
mod coordinator;
pub mod processing_loop;
pub mod sink;
pub mod source;

pub use coordinator::{SessionCoordinator, SessionStats};
pub use processing_loop::ProcessingLoop;
pub use sink::{ConsoleSink, JsonEventSink, NotificationSink};
pub use source::{JsonLinesSource, ReplaySource, SampleEvent, SampleSource};
pub use state::*;
