//! Posture classifier: geometric signal + baseline → posture label

use crate::config::ClassifierConfig;
use crate::types::{Classification, GeometricSignal, PostureLabel};

/// Stateless good/bad decision against the personal baseline.
///
/// The good-posture streak is threaded through by the caller so the
/// classifier itself holds nothing but thresholds.
#[derive(Debug, Clone)]
pub struct PostureClassifier {
    config: ClassifierConfig,
}

impl PostureClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify one frame.
    ///
    /// Forward lean is checked before shoulder tilt. Only a `Good` result
    /// extends the streak; either `Bad` branch resets it.
    pub fn classify(
        &self,
        signal: &GeometricSignal,
        body_detected: bool,
        baseline: Option<f64>,
        streak: u32,
    ) -> Classification {
        if !body_detected {
            return Classification {
                label: PostureLabel::Unknown,
                slouch_value: 0.0,
                stable_good_streak: streak,
            };
        }

        let slouch_value = round_to(signal.forward_lean, self.config.slouch_display_decimals);

        let Some(baseline) = baseline else {
            return Classification {
                label: PostureLabel::Calibrating,
                slouch_value,
                stable_good_streak: streak,
            };
        };

        let diff = signal.forward_lean - baseline;
        let (label, stable_good_streak) = if diff > self.config.lean_tolerance
            || signal.shoulder_tilt > self.config.tilt_tolerance
        {
            (PostureLabel::Bad, 0)
        } else {
            (PostureLabel::Good, streak.saturating_add(1))
        };

        Classification {
            label,
            slouch_value,
            stable_good_streak,
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PostureClassifier {
        PostureClassifier::new(ClassifierConfig::default())
    }

    #[test]
    fn test_no_body_is_unknown_and_keeps_streak() {
        let c = classifier().classify(&GeometricSignal::new(0.4, 0.3), false, Some(0.1), 17);
        assert_eq!(c.label, PostureLabel::Unknown);
        assert_eq!(c.slouch_value, 0.0);
        assert_eq!(c.stable_good_streak, 17);
    }

    #[test]
    fn test_uncalibrated_reports_raw_lean() {
        let c = classifier().classify(&GeometricSignal::new(0.12345, 0.0), true, None, 3);
        assert_eq!(c.label, PostureLabel::Calibrating);
        assert_eq!(c.slouch_value, 0.123);
        assert_eq!(c.stable_good_streak, 3);
    }

    #[test]
    fn test_forward_lean_past_tolerance_is_bad() {
        let c = classifier().classify(&GeometricSignal::new(0.2, 0.0), true, Some(0.1), 40);
        assert_eq!(c.label, PostureLabel::Bad);
        assert_eq!(c.stable_good_streak, 0);
    }

    #[test]
    fn test_lean_exactly_at_tolerance_is_good() {
        let c = classifier().classify(&GeometricSignal::new(0.05, 0.0), true, Some(0.0), 0);
        assert_eq!(c.label, PostureLabel::Good);
        assert_eq!(c.stable_good_streak, 1);
    }

    #[test]
    fn test_shoulder_tilt_alone_is_bad() {
        let c = classifier().classify(&GeometricSignal::new(0.1, 0.06), true, Some(0.1), 9);
        assert_eq!(c.label, PostureLabel::Bad);
        assert_eq!(c.stable_good_streak, 0);
    }

    #[test]
    fn test_leaning_back_is_good() {
        let c = classifier().classify(&GeometricSignal::new(-0.3, 0.0), true, Some(0.1), 5);
        assert_eq!(c.label, PostureLabel::Good);
        assert_eq!(c.stable_good_streak, 6);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.12351, 3), 0.124);
        assert_eq!(round_to(-0.0004, 3), -0.0);
        assert_eq!(round_to(1.5, 0), 2.0);
    }
}
