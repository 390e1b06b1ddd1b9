//! Session dashboard metrics: posture split and alert count
//!
//! Counters span absence resets. The fatigue chart itself lives in the
//! published `AppState`; the coordinator hands it one [`FatiguePoint`] per frame.

use serde::{Deserialize, Serialize};

use crate::types::{AlertIntents, PostureLabel};

/// One point of the fatigue chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatiguePoint {
    /// Seconds since the current fatigue session started
    pub elapsed_seconds: f64,
    pub fatigue_score: u8,
}

/// Running dashboard counters for the whole process lifetime.
#[derive(Debug, Clone, Default)]
pub struct SessionMetrics {
    good_frames: u64,
    bad_frames: u64,
    alerts: u64,
}

impl SessionMetrics {
    /// Count the frame's label. Only `Good` and `Bad` enter the posture split.
    pub fn record_frame(&mut self, label: PostureLabel) {
        match label {
            PostureLabel::Good => self.good_frames += 1,
            PostureLabel::Bad => self.bad_frames += 1,
            PostureLabel::Unknown | PostureLabel::Calibrating => {}
        }
    }

    /// Count beeps and break starts.
    pub fn record_alerts(&mut self, intents: &AlertIntents) {
        self.alerts += u64::from(intents.beep) + u64::from(intents.break_start);
    }

    pub fn good_frames(&self) -> u64 {
        self.good_frames
    }

    pub fn bad_frames(&self) -> u64 {
        self.bad_frames
    }

    pub fn alerts(&self) -> u64 {
        self.alerts
    }

    /// Good and bad share of classified frames, 0 each when none were classified.
    pub fn posture_split(&self) -> (f64, f64) {
        let total = self.good_frames + self.bad_frames;
        if total == 0 {
            return (0.0, 0.0);
        }
        let total = total as f64;
        (
            self.good_frames as f64 / total * 100.0,
            self.bad_frames as f64 / total * 100.0,
        )
    }

    /// Build the dashboard summary from the live fatigue figures.
    pub fn summary(
        &self,
        fatigue_score: u8,
        session_seconds: f64,
        total_bad_seconds: f64,
    ) -> SessionSummary {
        let (good_pct, bad_pct) = self.posture_split();
        SessionSummary {
            good_posture_pct: good_pct,
            bad_posture_pct: bad_pct,
            good_frames: self.good_frames,
            bad_frames: self.bad_frames,
            alerts_triggered: self.alerts,
            session_duration_secs: session_seconds.max(0.0).floor() as u64,
            total_bad_posture_secs: total_bad_seconds.max(0.0).floor() as u64,
            fatigue_score,
            risk_score: risk_score(fatigue_score, bad_pct),
        }
    }
}

/// Dashboard view of the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub good_posture_pct: f64,
    pub bad_posture_pct: f64,
    pub good_frames: u64,
    pub bad_frames: u64,
    pub alerts_triggered: u64,
    pub session_duration_secs: u64,
    pub total_bad_posture_secs: u64,
    pub fatigue_score: u8,
    pub risk_score: u8,
}

/// `min(100, fatigue + bad%)`, truncated.
pub fn risk_score(fatigue_score: u8, bad_pct: f64) -> u8 {
    let risk = f64::from(fatigue_score) + bad_pct.max(0.0);
    if risk >= 100.0 {
        100
    } else {
        risk.floor() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ignores_unknown_and_calibrating() {
        let mut m = SessionMetrics::default();
        m.record_frame(PostureLabel::Unknown);
        m.record_frame(PostureLabel::Calibrating);
        assert_eq!(m.posture_split(), (0.0, 0.0));

        m.record_frame(PostureLabel::Good);
        m.record_frame(PostureLabel::Good);
        m.record_frame(PostureLabel::Good);
        m.record_frame(PostureLabel::Bad);
        assert_eq!(m.posture_split(), (75.0, 25.0));
    }

    #[test]
    fn test_alerts_count_beeps_and_break_starts_only() {
        let mut m = SessionMetrics::default();
        m.record_alerts(&AlertIntents {
            beep: true,
            sit_straight: true,
            break_start: true,
            break_continue: true,
            ..Default::default()
        });
        m.record_alerts(&AlertIntents {
            break_stop: true,
            session_reset: true,
            ..Default::default()
        });
        assert_eq!(m.alerts(), 2);
    }

    #[test]
    fn test_risk_score_is_capped() {
        assert_eq!(risk_score(10, 25.5), 35);
        assert_eq!(risk_score(90, 40.0), 100);
        assert_eq!(risk_score(0, 0.0), 0);
    }

    #[test]
    fn test_summary_combines_counters_and_fatigue() {
        let mut m = SessionMetrics::default();
        m.record_frame(PostureLabel::Good);
        m.record_frame(PostureLabel::Bad);
        let s = m.summary(12, 61.7, 8.9);
        assert_eq!(s.good_posture_pct, 50.0);
        assert_eq!(s.session_duration_secs, 61);
        assert_eq!(s.total_bad_posture_secs, 8);
        assert_eq!(s.risk_score, 62);
    }
}
