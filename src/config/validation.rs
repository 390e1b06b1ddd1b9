//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::defaults::{
    SUSPICIOUS_ABSENCE_RESET_SECS, SUSPICIOUS_BREAK_DURATION_SECS, SUSPICIOUS_TOLERANCE,
};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for MonitorConfig.
///
/// Maintained by hand to match the struct hierarchy in monitor_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [session]
        "session",
        "session.name",
        // [calibration]
        "calibration",
        "calibration.calibration_samples",
        "calibration.rebaseline_good_streak",
        // [classifier]
        "classifier",
        "classifier.lean_tolerance",
        "classifier.tilt_tolerance",
        "classifier.slouch_display_decimals",
        // [fatigue]
        "fatigue",
        "fatigue.bad_posture_weight",
        "fatigue.sitting_seconds_per_point",
        "fatigue.max_score",
        // [alerts]
        "alerts",
        "alerts.bad_posture_grace_secs",
        "alerts.posture_beep_cooldown_secs",
        "alerts.break_fatigue_threshold",
        "alerts.break_trigger_cooldown_secs",
        "alerts.break_duration_secs",
        "alerts.post_break_cooldown_secs",
        "alerts.absence_reset_secs",
        // [dashboard]
        "dashboard",
        "dashboard.fatigue_history_capacity",
        // [server]
        "server",
        "server.addr",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        // Tie-break on the key so the suggestion does not depend on hash order
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new(); // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed MonitorConfig.
///
/// Returns (errors, warnings). Errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::MonitorConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Landmark coordinates are normalised to the frame, so no offset can exceed 1
    let c = &config.classifier;
    for (name, value) in [
        ("classifier.lean_tolerance", c.lean_tolerance),
        ("classifier.tilt_tolerance", c.tilt_tolerance),
    ] {
        if value > 1.0 {
            errors.push(format!(
                "{name} = {value:.3} is outside the normalised frame range (0-1)"
            ));
        } else if value > SUSPICIOUS_TOLERANCE {
            warnings.push(ValidationWarning {
                field: name.to_string(),
                message: format!(
                    "{name} = {value:.3} is above {SUSPICIOUS_TOLERANCE}, posture will almost never be flagged"
                ),
                suggestion: None,
            });
        }
    }

    let a = &config.alerts;
    if a.absence_reset_secs > SUSPICIOUS_ABSENCE_RESET_SECS {
        warnings.push(ValidationWarning {
            field: "alerts.absence_reset_secs".to_string(),
            message: format!(
                "absence_reset_secs = {:.0} is longer than {:.0} s, sessions will rarely reset",
                a.absence_reset_secs, SUSPICIOUS_ABSENCE_RESET_SECS
            ),
            suggestion: None,
        });
    }
    if a.break_duration_secs > SUSPICIOUS_BREAK_DURATION_SECS {
        warnings.push(ValidationWarning {
            field: "alerts.break_duration_secs".to_string(),
            message: format!(
                "break_duration_secs = {:.0} is longer than {:.0} s",
                a.break_duration_secs, SUSPICIOUS_BREAK_DURATION_SECS
            ),
            suggestion: None,
        });
    }

    // A grace period longer than the beep cooldown is normal; zero means every bad frame prompts
    if a.bad_posture_grace_secs == 0 {
        warnings.push(ValidationWarning {
            field: "alerts.bad_posture_grace_secs".to_string(),
            message: "bad_posture_grace_secs = 0 prompts after the first second of bad posture"
                .to_string(),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("tolerence", "tolerance"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r"
            [alerts]
            break_duration_secs = 8.0
        "
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"alerts".to_string()));
        assert!(keys.contains(&"alerts.break_duration_secs".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r"
[classifier]
lean_tolerence = 0.08
";
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("lean_tolerence"));
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("classifier.lean_tolerance")
        );
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[session]
name = "desk-1"

[calibration]
calibration_samples = 30

[alerts]
absence_reset_secs = 10.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {warnings:?}");
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[camera]\nindex = 0\n");
        assert!(warnings.iter().any(|w| w.field == "camera"));
        assert!(warnings.iter().any(|w| w.field == "camera.index"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_known_keys_match_serialized_defaults() {
        let value: toml::Value = MonitorConfig::default().to_toml().unwrap().parse().unwrap();
        let known = known_config_keys();
        for key in walk_toml_keys(&value, "") {
            assert!(known.contains(key.as_str()), "missing known key: {key}");
        }
    }

    #[test]
    fn test_physical_range_defaults_clean() {
        let (errors, warnings) = validate_physical_ranges(&MonitorConfig::default());
        assert!(errors.is_empty(), "Defaults should produce no errors: {errors:?}");
        assert!(warnings.is_empty(), "Defaults should produce no warnings: {warnings:?}");
    }

    #[test]
    fn test_physical_range_tolerance_suspicious() {
        let mut config = MonitorConfig::default();
        config.classifier.tilt_tolerance = 0.7;
        let (errors, warnings) = validate_physical_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "classifier.tilt_tolerance"));
    }

    #[test]
    fn test_physical_range_tolerance_impossible() {
        let mut config = MonitorConfig::default();
        config.classifier.lean_tolerance = 2.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("lean_tolerance")));
    }

    #[test]
    fn test_physical_range_long_absence_grace() {
        let mut config = MonitorConfig::default();
        config.alerts.absence_reset_secs = 3_600.0;
        let (_, warnings) = validate_physical_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "alerts.absence_reset_secs"));
    }
}
