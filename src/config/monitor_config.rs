//! Monitor Configuration - every posture/fatigue/alert tunable as a TOML value
//!
//! Each struct implements `Default` with the stock values, so a missing or
//! empty config file yields the standard behaviour.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable holding the path of the config file to load.
pub const CONFIG_ENV_VAR: &str = "POSTURE_GUARD_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const LOCAL_CONFIG_FILE: &str = "posture_guard.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a monitoring session.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$POSTURE_GUARD_CONFIG` env var
/// 2. `./posture_guard.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Session identification
    #[serde(default)]
    pub session: SessionInfo,

    /// Baseline calibration windows
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Posture classification tolerances
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Fatigue score weights
    #[serde(default)]
    pub fatigue: FatigueConfig,

    /// Beep / break timers and cooldowns
    #[serde(default)]
    pub alerts: AlertConfig,

    /// Session dashboard buffers
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$POSTURE_GUARD_CONFIG` environment variable
    /// 2. `./posture_guard.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), session = %config.session.name, "Loaded monitor config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./posture_guard.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(session = %config.session.name, "Loaded monitor config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    ///
    /// Unknown keys are logged as warnings; structural problems are errors.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        // Two-pass: check for unknown keys first (warnings only)
        let typo_warnings = super::validation::validate_unknown_keys(&contents);
        for w in &typo_warnings {
            warn!("{}", w);
        }

        let config = Self::from_toml_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without validating. Missing sections and fields take defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Monitor config saved");
        Ok(())
    }

    /// Validate all tunables for internal consistency.
    ///
    /// Rules:
    /// - Sample windows must be > 0
    /// - Tolerances, weights and cooldowns must be finite and >= 0
    /// - Divisors and the break duration must be > 0
    /// - `1 <= max_score <= 100` and the break threshold must sit below it
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        // Calibration windows
        let cal = &self.calibration;
        if cal.calibration_samples == 0 {
            errors.push("calibration.calibration_samples must be > 0".to_string());
        }
        if cal.rebaseline_good_streak == 0 {
            errors.push("calibration.rebaseline_good_streak must be > 0".to_string());
        }

        // Classifier tolerances
        let c = &self.classifier;
        Self::check_non_negative(c.lean_tolerance, "classifier.lean_tolerance", &mut errors);
        Self::check_non_negative(c.tilt_tolerance, "classifier.tilt_tolerance", &mut errors);
        if c.slouch_display_decimals > super::defaults::MAX_SLOUCH_DISPLAY_DECIMALS {
            errors.push(format!(
                "classifier.slouch_display_decimals ({}) must be <= {}",
                c.slouch_display_decimals,
                super::defaults::MAX_SLOUCH_DISPLAY_DECIMALS
            ));
        }

        // Fatigue weights: the seconds-per-point divisor must be positive
        let f = &self.fatigue;
        Self::check_non_negative(f.bad_posture_weight, "fatigue.bad_posture_weight", &mut errors);
        Self::check_positive(
            f.sitting_seconds_per_point,
            "fatigue.sitting_seconds_per_point",
            &mut errors,
        );
        if f.max_score == 0 || f.max_score > 100 {
            errors.push(format!(
                "fatigue.max_score ({}) must be within 1..=100",
                f.max_score
            ));
        }

        // Alert timers
        let a = &self.alerts;
        Self::check_non_negative(
            a.posture_beep_cooldown_secs,
            "alerts.posture_beep_cooldown_secs",
            &mut errors,
        );
        Self::check_non_negative(
            a.break_trigger_cooldown_secs,
            "alerts.break_trigger_cooldown_secs",
            &mut errors,
        );
        Self::check_positive(a.break_duration_secs, "alerts.break_duration_secs", &mut errors);
        Self::check_non_negative(
            a.post_break_cooldown_secs,
            "alerts.post_break_cooldown_secs",
            &mut errors,
        );
        Self::check_non_negative(a.absence_reset_secs, "alerts.absence_reset_secs", &mut errors);
        if a.break_fatigue_threshold >= f.max_score {
            errors.push(format!(
                "alerts.break_fatigue_threshold ({}) must be < fatigue.max_score ({})",
                a.break_fatigue_threshold, f.max_score
            ));
        }

        if self.dashboard.fatigue_history_capacity == 0 {
            errors.push("dashboard.fatigue_history_capacity must be > 0".to_string());
        }

        // Physical range validation
        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_non_negative(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN comparisons silently pass, catch them explicitly
        if !value.is_finite() {
            errors.push(format!("{name}: value must be finite (got {value})"));
            return;
        }
        if value < 0.0 {
            errors.push(format!("{name} ({value:.3}) must be >= 0"));
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() {
            errors.push(format!("{name}: value must be finite (got {value})"));
            return;
        }
        if value <= 0.0 {
            errors.push(format!("{name} ({value:.3}) must be > 0"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Session Info
// ============================================================================

/// Identification metadata, shown in logs and on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session / workstation name
    #[serde(default = "default_session_name")]
    pub name: String,
}

fn default_session_name() -> String {
    "workstation".to_string()
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            name: default_session_name(),
        }
    }
}

// ============================================================================
// Calibration
// ============================================================================

/// Personal baseline windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Body-detected samples to observe before the baseline is captured.
    /// The baseline is taken from the sample after this window.
    #[serde(default = "default_calibration_samples")]
    pub calibration_samples: u32,

    /// Consecutive good samples after which the baseline is re-captured.
    #[serde(default = "default_rebaseline_good_streak")]
    pub rebaseline_good_streak: u32,
}

fn default_calibration_samples() -> u32 { 60 }
fn default_rebaseline_good_streak() -> u32 { 120 }

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            calibration_samples: default_calibration_samples(),
            rebaseline_good_streak: default_rebaseline_good_streak(),
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Thresholds for the good/bad decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Allowed forward-lean increase over the baseline before posture is bad.
    #[serde(default = "default_lean_tolerance")]
    pub lean_tolerance: f64,

    /// Absolute shoulder height difference above which posture is bad.
    #[serde(default = "default_tilt_tolerance")]
    pub tilt_tolerance: f64,

    /// Decimal places kept in the displayed slouch value.
    #[serde(default = "default_slouch_display_decimals")]
    pub slouch_display_decimals: u32,
}

fn default_lean_tolerance() -> f64 { 0.05 }
fn default_tilt_tolerance() -> f64 { 0.05 }
fn default_slouch_display_decimals() -> u32 { 3 }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            lean_tolerance: default_lean_tolerance(),
            tilt_tolerance: default_tilt_tolerance(),
            slouch_display_decimals: default_slouch_display_decimals(),
        }
    }
}

// ============================================================================
// Fatigue
// ============================================================================

/// Fatigue score composition.
///
/// `score = min(max_score, floor(bad_seconds * bad_posture_weight
///          + session_seconds / sitting_seconds_per_point))`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueConfig {
    /// Points per second of bad posture.
    #[serde(default = "default_bad_posture_weight")]
    pub bad_posture_weight: f64,

    /// Seconds of sitting per fatigue point.
    #[serde(default = "default_sitting_seconds_per_point")]
    pub sitting_seconds_per_point: f64,

    /// Score ceiling.
    #[serde(default = "default_max_score")]
    pub max_score: u8,
}

fn default_bad_posture_weight() -> f64 { 0.5 }
fn default_sitting_seconds_per_point() -> f64 { 20.0 }
fn default_max_score() -> u8 { 100 }

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            bad_posture_weight: default_bad_posture_weight(),
            sitting_seconds_per_point: default_sitting_seconds_per_point(),
            max_score: default_max_score(),
        }
    }
}

// ============================================================================
// Alerts
// ============================================================================

/// Posture beep and break alert timing (all seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Whole seconds of continuous bad posture tolerated before prompting.
    #[serde(default = "default_bad_posture_grace_secs")]
    pub bad_posture_grace_secs: u64,

    /// Minimum gap between two posture beeps.
    #[serde(default = "default_posture_beep_cooldown_secs")]
    pub posture_beep_cooldown_secs: f64,

    /// Fatigue score above which a break is requested.
    #[serde(default = "default_break_fatigue_threshold")]
    pub break_fatigue_threshold: u8,

    /// Minimum gap between two break triggers.
    #[serde(default = "default_break_trigger_cooldown_secs")]
    pub break_trigger_cooldown_secs: f64,

    /// How long a break alert plays.
    #[serde(default = "default_break_duration_secs")]
    pub break_duration_secs: f64,

    /// Quiet period after a break ends.
    #[serde(default = "default_post_break_cooldown_secs")]
    pub post_break_cooldown_secs: f64,

    /// Continuous absence after which the session is reset.
    #[serde(default = "default_absence_reset_secs")]
    pub absence_reset_secs: f64,
}

fn default_bad_posture_grace_secs() -> u64 { 6 }
fn default_posture_beep_cooldown_secs() -> f64 { 5.0 }
fn default_break_fatigue_threshold() -> u8 { 20 }
fn default_break_trigger_cooldown_secs() -> f64 { 5.0 }
fn default_break_duration_secs() -> f64 { 8.0 }
fn default_post_break_cooldown_secs() -> f64 { 20.0 }
fn default_absence_reset_secs() -> f64 { 5.0 }

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            bad_posture_grace_secs: default_bad_posture_grace_secs(),
            posture_beep_cooldown_secs: default_posture_beep_cooldown_secs(),
            break_fatigue_threshold: default_break_fatigue_threshold(),
            break_trigger_cooldown_secs: default_break_trigger_cooldown_secs(),
            break_duration_secs: default_break_duration_secs(),
            post_break_cooldown_secs: default_post_break_cooldown_secs(),
            absence_reset_secs: default_absence_reset_secs(),
        }
    }
}

// ============================================================================
// Dashboard
// ============================================================================

/// Session dashboard buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Maximum `(elapsed, fatigue)` points kept for the fatigue chart.
    #[serde(default = "default_fatigue_history_capacity")]
    pub fatigue_history_capacity: usize,
}

fn default_fatigue_history_capacity() -> usize {
    super::defaults::FATIGUE_HISTORY_CAPACITY
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            fatigue_history_capacity: default_fatigue_history_capacity(),
        }
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Dashboard API bind address.
    ///
    /// Can be overridden by the `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
