//! Single-channel notification cooldown tracker

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Cooldown that suppresses a notification until `period_secs` have passed
/// since it last fired.
///
/// A cooldown that never fired is always ready.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    period_secs: f64,
    last_fired: Option<Timestamp>,
}

impl Cooldown {
    /// Create a new cooldown with the given period in seconds.
    pub fn new(period_secs: f64) -> Self {
        Self {
            period_secs,
            last_fired: None,
        }
    }

    /// Whether the notification may fire at `now`.
    ///
    /// The period must be strictly exceeded.
    pub fn ready(&self, now: Timestamp) -> bool {
        self.last_fired
            .map_or(true, |last| now - last > self.period_secs)
    }

    /// Record that the notification fired (or that the timer was refreshed).
    pub fn mark(&mut self, now: Timestamp) {
        self.last_fired = Some(now);
    }

    pub fn last_fired(&self) -> Option<Timestamp> {
        self.last_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_before_first_fire() {
        let cooldown = Cooldown::new(5.0);
        assert!(cooldown.ready(0.0));
        assert!(cooldown.last_fired().is_none());
    }

    #[test]
    fn suppresses_within_period() {
        let mut cooldown = Cooldown::new(5.0);
        cooldown.mark(100.0);
        assert!(!cooldown.ready(103.0));
        // Exactly the period is not enough
        assert!(!cooldown.ready(105.0));
        assert!(cooldown.ready(105.01));
    }

    #[test]
    fn zero_period_allows_any_later_time() {
        let mut cooldown = Cooldown::new(0.0);
        cooldown.mark(1.0);
        assert!(!cooldown.ready(1.0));
        assert!(cooldown.ready(1.001));
    }

    #[test]
    fn mark_pushes_the_window_forward() {
        let mut cooldown = Cooldown::new(5.0);
        cooldown.mark(0.0);
        cooldown.mark(4.0);
        assert!(!cooldown.ready(6.0));
        assert!(cooldown.ready(9.5));
    }
}
