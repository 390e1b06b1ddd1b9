//! Monitor Configuration Module
//!
//! Provides session configuration loaded from TOML files: calibration windows,
//! classifier tolerances, fatigue weights and alert timers.
//!
//! ## Loading Order
//!
//! 1. `POSTURE_GUARD_CONFIG` environment variable (path to TOML file)
//! 2. `posture_guard.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The config is loaded once in `main()` and handed to the components that
//! need it:
//!
//! ```ignore
//! let config = MonitorConfig::load();
//! let coordinator = SessionCoordinator::new(config, start)?;
//! ```

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
