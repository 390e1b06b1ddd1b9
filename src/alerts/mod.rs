//! Alert State Machine - posture beeps, break alerts and the absence watchdog
//!
//! Consumes the posture label and fatigue score once per frame and decides
//! which notifications the caller should play. Two independent channels share
//! one state struct:
//!
//! - **Posture beep**: a short beep when bad posture outlasts the grace period,
//!   rate limited by its own cooldown.
//! - **Break alert**: looping playback when fatigue crosses the threshold,
//!   stopped after a fixed duration or when the user leaves, followed by a
//!   quiet period.
//!
//! ## States
//!
//! ```text
//!            fatigue > threshold, present,
//!            cooldowns elapsed
//!   ┌──────┐ ───────────────────────────▶ ┌─────────────┐
//!   │ Idle │                              │ BreakActive │
//!   └──────┘ ◀─────────────────────────── └─────────────┘
//!            duration elapsed / absent
//!            (post-break cooldown starts)
//! ```
//!
//! ## Absence watchdog
//!
//! Every absent frame refreshes the posture-beep timer, so the first beep
//! after returning waits out a full cooldown. Once absence lasts longer than
//! `absence_reset_secs` the break-trigger timer is refreshed on every frame,
//! an active break is silenced, and a single `session_reset` is emitted for
//! the whole absence run.
//!
//! Both the break trigger and the absence watchdog write the same
//! break-trigger timestamp. A long absence therefore also delays the next
//! break by one trigger cooldown after the user returns.

mod cooldown;

pub use cooldown::Cooldown;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AlertConfig;
use crate::types::{AlertIntents, PostureLabel, Timestamp};

/// Coarse state of the break channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertPhase {
    Idle,
    BreakActive,
}

impl std::fmt::Display for AlertPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::BreakActive => write!(f, "BreakActive"),
        }
    }
}

/// Mutable alert bookkeeping. Only [`AlertStateMachine::tick`] changes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    /// Posture beep rate limit (also refreshed while absent)
    pub posture_beep: Cooldown,
    /// Break trigger rate limit (also refreshed after the absence timeout)
    pub break_trigger: Cooldown,
    /// Start of the active break, `None` when idle
    pub break_started_at: Option<Timestamp>,
    /// No new break may start until strictly after this time
    pub break_cooldown_until: Option<Timestamp>,
    /// Start of the current absence run
    pub absent_since: Option<Timestamp>,
    /// `session_reset` already emitted for the current absence run
    pub absence_reset_issued: bool,
    /// Beeps plus break starts since the machine was created
    pub alerts_issued: u64,
}

impl AlertState {
    fn new(config: &AlertConfig) -> Self {
        Self {
            posture_beep: Cooldown::new(config.posture_beep_cooldown_secs),
            break_trigger: Cooldown::new(config.break_trigger_cooldown_secs),
            break_started_at: None,
            break_cooldown_until: None,
            absent_since: None,
            absence_reset_issued: false,
            alerts_issued: 0,
        }
    }

    pub fn phase(&self) -> AlertPhase {
        if self.break_started_at.is_some() {
            AlertPhase::BreakActive
        } else {
            AlertPhase::Idle
        }
    }

    pub fn break_active(&self) -> bool {
        self.break_started_at.is_some()
    }
}

/// Drives the beep and break channels from per-frame posture and fatigue.
#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    config: AlertConfig,
    state: AlertState,
}

impl AlertStateMachine {
    pub fn new(config: AlertConfig) -> Self {
        let state = AlertState::new(&config);
        Self { config, state }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn phase(&self) -> AlertPhase {
        self.state.phase()
    }

    pub fn alerts_issued(&self) -> u64 {
        self.state.alerts_issued
    }

    /// Whether the current absence run has outlasted the reset timeout.
    ///
    /// Stays true on every absent frame past the timeout, unlike the
    /// one-shot `session_reset` intent.
    pub fn absence_expired(&self, now: Timestamp) -> bool {
        self.state
            .absent_since
            .is_some_and(|since| now - since > self.config.absence_reset_secs)
    }

    /// Advance the machine by one frame.
    ///
    /// Evaluated in a fixed order: absence watchdog, posture beep, break
    /// trigger, break lifecycle.
    pub fn tick(
        &mut self,
        label: PostureLabel,
        fatigue_score: u8,
        bad_duration: u64,
        now: Timestamp,
    ) -> AlertIntents {
        let mut intents = AlertIntents::default();

        self.watch_absence(label, now, &mut intents);
        self.check_posture_beep(bad_duration, now, &mut intents);
        self.check_break_trigger(label, fatigue_score, now, &mut intents);
        self.advance_break(label, now, &mut intents);

        if intents.any() {
            debug!(%label, fatigue_score, bad_duration, ?intents, "Alert intents");
        }
        intents
    }

    fn watch_absence(&mut self, label: PostureLabel, now: Timestamp, intents: &mut AlertIntents) {
        if label.is_present() {
            if let Some(since) = self.state.absent_since.take() {
                debug!(absent_for = now - since, "User returned");
            }
            self.state.absence_reset_issued = false;
            return;
        }

        self.state.absent_since.get_or_insert(now);
        self.state.posture_beep.mark(now);

        if !self.absence_expired(now) {
            return;
        }

        self.state.break_trigger.mark(now);

        if !self.state.absence_reset_issued {
            self.state.absence_reset_issued = true;
            intents.session_reset = true;
            info!(
                timeout_secs = self.config.absence_reset_secs,
                "User absent past timeout, resetting session"
            );
        }

        if self.state.break_started_at.take().is_some() {
            intents.break_stop = true;
            info!("Break alert silenced, user left");
        }
    }

    fn check_posture_beep(&mut self, bad_duration: u64, now: Timestamp, intents: &mut AlertIntents) {
        if bad_duration <= self.config.bad_posture_grace_secs {
            return;
        }

        intents.sit_straight = true;

        if self.state.posture_beep.ready(now) {
            self.state.posture_beep.mark(now);
            self.state.alerts_issued += 1;
            intents.beep = true;
            info!(
                bad_duration,
                alerts = self.state.alerts_issued,
                "Posture beep"
            );
        }
    }

    fn check_break_trigger(
        &mut self,
        label: PostureLabel,
        fatigue_score: u8,
        now: Timestamp,
        intents: &mut AlertIntents,
    ) {
        let past_quiet_period = self
            .state
            .break_cooldown_until
            .map_or(true, |until| now > until);

        if fatigue_score > self.config.break_fatigue_threshold
            && !self.state.break_active()
            && label.is_present()
            && past_quiet_period
            && self.state.break_trigger.ready(now)
        {
            self.state.break_started_at = Some(now);
            self.state.break_trigger.mark(now);
            self.state.alerts_issued += 1;
            intents.break_start = true;
            info!(
                fatigue_score,
                duration_secs = self.config.break_duration_secs,
                alerts = self.state.alerts_issued,
                "Break alert started"
            );
        }
    }

    fn advance_break(&mut self, label: PostureLabel, now: Timestamp, intents: &mut AlertIntents) {
        let Some(started) = self.state.break_started_at else {
            return;
        };

        let elapsed = now - started;
        if elapsed >= self.config.break_duration_secs || !label.is_present() {
            self.state.break_started_at = None;
            let until = now + self.config.post_break_cooldown_secs;
            self.state.break_cooldown_until = Some(until);
            intents.break_stop = true;
            info!(
                elapsed,
                user_left = !label.is_present(),
                quiet_until = until,
                "Break alert stopped"
            );
        } else {
            intents.break_continue = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> AlertStateMachine {
        AlertStateMachine::new(AlertConfig::default())
    }

    #[test]
    fn test_quiet_when_nothing_is_wrong() {
        let mut m = machine();
        let intents = m.tick(PostureLabel::Good, 5, 0, 10.0);
        assert_eq!(intents, AlertIntents::default());
        assert_eq!(m.phase(), AlertPhase::Idle);
    }

    #[test]
    fn test_sit_straight_needs_grace_to_be_exceeded() {
        let mut m = machine();
        assert!(!m.tick(PostureLabel::Bad, 0, 6, 10.0).sit_straight);
        let intents = m.tick(PostureLabel::Bad, 0, 7, 11.0);
        assert!(intents.sit_straight);
        assert!(intents.beep);
        assert_eq!(m.alerts_issued(), 1);
    }

    #[test]
    fn test_beep_rate_limited_but_prompt_stays() {
        let mut m = machine();
        assert!(m.tick(PostureLabel::Bad, 0, 7, 10.0).beep);
        let intents = m.tick(PostureLabel::Bad, 0, 12, 15.0);
        assert!(intents.sit_straight);
        assert!(!intents.beep);
        assert!(m.tick(PostureLabel::Bad, 0, 12, 15.5).beep);
        assert_eq!(m.alerts_issued(), 2);
    }

    #[test]
    fn test_break_starts_and_continues_on_same_tick() {
        let mut m = machine();
        let intents = m.tick(PostureLabel::Good, 21, 0, 100.0);
        assert!(intents.break_start);
        assert!(intents.break_continue);
        assert!(!intents.break_stop);
        assert_eq!(m.phase(), AlertPhase::BreakActive);
        assert_eq!(m.alerts_issued(), 1);
    }

    #[test]
    fn test_break_requires_fatigue_strictly_above_threshold() {
        let mut m = machine();
        assert!(!m.tick(PostureLabel::Good, 20, 0, 100.0).break_start);
    }

    #[test]
    fn test_break_ends_after_duration_then_quiet_period() {
        let mut m = machine();
        assert!(m.tick(PostureLabel::Good, 30, 0, 100.0).break_start);
        assert!(m.tick(PostureLabel::Good, 30, 0, 107.9).break_continue);

        let intents = m.tick(PostureLabel::Good, 30, 0, 108.0);
        assert!(intents.break_stop);
        assert!(!intents.break_continue);
        assert_eq!(m.state().break_cooldown_until, Some(128.0));

        assert!(!m.tick(PostureLabel::Good, 30, 0, 128.0).break_start);
        assert!(m.tick(PostureLabel::Good, 30, 0, 128.1).break_start);
    }

    #[test]
    fn test_break_stops_when_user_leaves() {
        let mut m = machine();
        m.tick(PostureLabel::Good, 30, 0, 100.0);
        let intents = m.tick(PostureLabel::Unknown, 30, 0, 101.0);
        assert!(intents.break_stop);
        assert!(!intents.session_reset);
        assert_eq!(m.state().break_cooldown_until, Some(121.0));
    }

    #[test]
    fn test_no_break_while_absent() {
        let mut m = machine();
        assert!(!m.tick(PostureLabel::Unknown, 90, 0, 100.0).break_start);
    }

    #[test]
    fn test_absence_refreshes_beep_timer() {
        let mut m = machine();
        m.tick(PostureLabel::Unknown, 0, 0, 100.0);
        m.tick(PostureLabel::Unknown, 0, 0, 102.0);
        // Back and slouching, but the beep timer was refreshed at 102
        assert!(!m.tick(PostureLabel::Bad, 0, 7, 106.0).beep);
        assert!(m.tick(PostureLabel::Bad, 0, 8, 107.5).beep);
    }

    #[test]
    fn test_session_reset_once_per_absence_run() {
        let mut m = machine();
        let mut resets = 0;
        for i in 0..=40 {
            let now = 200.0 + f64::from(i) * 0.25;
            if m.tick(PostureLabel::Unknown, 0, 0, now).session_reset {
                resets += 1;
                assert!(now - 200.0 > 5.0);
            }
        }
        assert_eq!(resets, 1);
        assert!(m.absence_expired(210.0));

        // Returning re-arms the latch
        m.tick(PostureLabel::Good, 0, 0, 211.0);
        assert!(!m.absence_expired(211.0));
        let mut resets = 0;
        for i in 0..30 {
            let now = 212.0 + f64::from(i) * 0.5;
            if m.tick(PostureLabel::Unknown, 0, 0, now).session_reset {
                resets += 1;
            }
        }
        assert_eq!(resets, 1);
    }

    #[test]
    fn test_absence_timeout_delays_next_break() {
        let mut m = machine();
        m.tick(PostureLabel::Unknown, 0, 0, 0.0);
        m.tick(PostureLabel::Unknown, 0, 0, 6.0);
        // Break-trigger timer refreshed at 6.0
        assert!(!m.tick(PostureLabel::Good, 50, 0, 10.0).break_start);
        assert!(m.tick(PostureLabel::Good, 50, 0, 11.5).break_start);
    }

    #[test]
    fn test_short_absence_does_not_reset() {
        let mut m = machine();
        for i in 0..10 {
            let intents = m.tick(PostureLabel::Unknown, 0, 0, f64::from(i) * 0.5);
            assert!(!intents.session_reset);
        }
        m.tick(PostureLabel::Good, 0, 0, 5.0);
        assert!(m.state().absent_since.is_none());
    }
}
