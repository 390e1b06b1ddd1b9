//! Config Validation Tests
//!
//! Typo detection, physical range checks and file loading for
//! `MonitorConfig`, exercised independently from the rest of the pipeline.

use std::io::Write;

use posture_guard::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use posture_guard::config::{ConfigError, MonitorConfig};

fn validation_errors(config: &MonitorConfig) -> Vec<String> {
    match config.validate() {
        Err(ConfigError::Validation(errors)) => errors,
        Err(other) => panic!("unexpected error: {other}"),
        Ok(()) => Vec::new(),
    }
}

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_tolerance_warns_with_suggestion() {
    let toml_str = r#"
[classifier]
lean_tolerence = 0.08
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("lean_tolerence"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("classifier.lean_tolerance")
    );
}

#[test]
fn misspelled_section_warns_for_section_and_key() {
    let toml_str = r#"
[alert]
absence_reset_secs = 10.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("alerts"));
    assert_eq!(
        warnings[1].suggestion.as_deref(),
        Some("alerts.absence_reset_secs")
    );
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[session]
name = "desk-3"

[calibration]
calibration_samples = 90
rebaseline_good_streak = 150

[classifier]
lean_tolerance = 0.06
tilt_tolerance = 0.04

[fatigue]
bad_posture_weight = 0.4
sitting_seconds_per_point = 30.0
max_score = 100

[alerts]
bad_posture_grace_secs = 8
break_fatigue_threshold = 40
absence_reset_secs = 30.0

[server]
addr = "0.0.0.0:9090"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}

#[test]
fn unknown_section_without_close_match_has_no_suggestion() {
    let warnings = validate_unknown_keys("[telemetry_export]\nenabled = true\n");
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|w| w.suggestion.is_none()));
}

#[test]
fn empty_toml_produces_zero_warnings() {
    assert!(validate_unknown_keys("").is_empty());
}

#[test]
fn known_keys_cover_every_serialized_field() {
    let known = known_config_keys();
    let serialized = MonitorConfig::default().to_toml().unwrap();
    let value: toml::Value = serialized.parse().unwrap();
    for key in posture_guard::config::validation::walk_toml_keys(&value, "") {
        assert!(known.contains(key.as_str()), "missing known key: {key}");
    }
}

#[test]
fn suggest_correction_returns_none_for_garbage() {
    let known = known_config_keys();
    assert_eq!(suggest_correction("zzzzzzzzzzzzzzzz", &known), None);
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn all_defaults_pass_validation() {
    assert!(MonitorConfig::default().validate().is_ok());
}

#[test]
fn tolerance_above_one_is_error() {
    let mut config = MonitorConfig::default();
    config.classifier.lean_tolerance = 1.5;
    let (errors, _) = validate_physical_ranges(&config);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("classifier.lean_tolerance"));
    assert!(config.validate().is_err());
}

#[test]
fn large_tolerance_is_only_a_warning() {
    let mut config = MonitorConfig::default();
    config.classifier.tilt_tolerance = 0.7;
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "classifier.tilt_tolerance");
    assert!(config.validate().is_ok());
}

#[test]
fn long_absence_timeout_is_warning() {
    let mut config = MonitorConfig::default();
    config.alerts.absence_reset_secs = 3_600.0;
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings
        .iter()
        .any(|w| w.field == "alerts.absence_reset_secs"));
}

#[test]
fn nan_and_negative_timers_are_rejected() {
    let mut config = MonitorConfig::default();
    config.alerts.posture_beep_cooldown_secs = f64::NAN;
    config.alerts.post_break_cooldown_secs = -1.0;
    let errors = validation_errors(&config);
    assert!(errors.iter().any(|e| e.contains("posture_beep_cooldown_secs")));
    assert!(errors.iter().any(|e| e.contains("post_break_cooldown_secs")));
}

#[test]
fn zero_windows_and_divisor_are_rejected() {
    let mut config = MonitorConfig::default();
    config.calibration.calibration_samples = 0;
    config.calibration.rebaseline_good_streak = 0;
    config.fatigue.sitting_seconds_per_point = 0.0;
    config.alerts.break_duration_secs = 0.0;
    let errors = validation_errors(&config);
    assert_eq!(errors.len(), 4, "errors: {errors:?}");
}

#[test]
fn break_threshold_must_sit_below_max_score() {
    let mut config = MonitorConfig::default();
    config.fatigue.max_score = 50;
    config.alerts.break_fatigue_threshold = 50;
    let errors = validation_errors(&config);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("break_fatigue_threshold"));

    config.fatigue.max_score = 101;
    config.alerts.break_fatigue_threshold = 20;
    let errors = validation_errors(&config);
    assert!(errors.iter().any(|e| e.contains("max_score")));
}

// ============================================================================
// File Loading
// ============================================================================

#[test]
fn partial_file_fills_in_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[alerts]\nbreak_duration_secs = 300.0").unwrap();
    file.flush().unwrap();

    let config = MonitorConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.alerts.break_duration_secs, 300.0);
    assert_eq!(config.alerts.bad_posture_grace_secs, 6);
    assert_eq!(config.calibration.calibration_samples, 60);
    assert_eq!(config.server.addr, "127.0.0.1:8080");
}

#[test]
fn invalid_file_is_rejected_on_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[fatigue]\nmax_score = 0").unwrap();
    file.flush().unwrap();

    let result = MonitorConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn malformed_file_is_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[classifier\nlean_tolerance = ").unwrap();
    file.flush().unwrap();

    let result = MonitorConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Parse(..))));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = MonitorConfig::load_from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(..))));
}

#[test]
fn save_and_reload_preserves_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("posture_guard.toml");

    let mut config = MonitorConfig::default();
    config.session.name = "standing-desk".to_string();
    config.classifier.lean_tolerance = 0.07;
    config.alerts.break_fatigue_threshold = 35;
    config.save_to_file(&path).unwrap();

    let reloaded = MonitorConfig::load_from_file(&path).unwrap();
    assert_eq!(reloaded, config);
}
