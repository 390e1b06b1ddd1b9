//! Shared data structures for the posture decision pipeline
//!
//! This module defines the core types passed between the pipeline stages:
//! - Ingestion: FrameSample / GeometricSignal (from the pose-estimation collaborator)
//! - Classification: PostureLabel, Classification
//! - Alerting: AlertIntents (notification directives)
//! - Output: TickOutput (everything a renderer or dashboard needs per frame)

mod frame;
mod posture;
mod alerts;

pub use frame::*;
pub use posture::*;
pub use alerts::*;
