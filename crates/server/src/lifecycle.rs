//! Match lifecycle.
//!
//! `NotStarted -> Running -> Ended`. Leaving `Ended` is not a transition of
//! this machine: the whole match is replaced by a fresh one.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for enough players.
    NotStarted,
    /// Clock counting down.
    Running,
    /// Clock ran out; waiting for the reset.
    Ended,
}

/// Outcome of one countdown second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// Still running, with the remaining seconds.
    Ticking(u32),
    /// This second ended the match.
    Expired,
    /// The clock is not running; the countdown should stop.
    Idle,
}

/// Phase plus remaining time of one match.
#[derive(Debug, Clone)]
pub struct MatchClock {
    phase: Phase,
    remaining: u32,
    end_reported: bool,
}

impl MatchClock {
    /// A clock waiting to start with `duration_secs` on it (at least one second).
    pub fn new(duration_secs: u32) -> Self {
        Self {
            phase: Phase::NotStarted,
            remaining: duration_secs.max(1),
            end_reported: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Remaining seconds; pinned at 0 once ended.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_started(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// Start the clock if `population` reached `min_players`.
    ///
    /// Returns true only on the transition into `Running`.
    pub fn try_start(&mut self, population: usize, min_players: usize) -> bool {
        if self.phase != Phase::NotStarted || population < min_players {
            return false;
        }
        self.phase = Phase::Running;
        debug!("Clock started with {}s", self.remaining);
        true
    }

    /// One second elapsed.
    pub fn on_second(&mut self) -> Countdown {
        if self.phase != Phase::Running {
            return Countdown::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.phase = Phase::Ended;
            Countdown::Expired
        } else {
            Countdown::Ticking(self.remaining)
        }
    }

    /// True exactly once after the clock expired.
    pub fn take_end_report(&mut self) -> bool {
        if self.phase == Phase::Ended && !self.end_reported {
            self.end_reported = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_threshold_only() {
        let mut clock = MatchClock::new(300);
        assert!(!clock.try_start(1, 2));
        assert_eq!(clock.phase(), Phase::NotStarted);
        assert!(clock.try_start(2, 2));
        assert!(clock.is_started());
        assert!(!clock.try_start(3, 2));
    }

    #[test]
    fn test_idle_before_start() {
        let mut clock = MatchClock::new(300);
        assert_eq!(clock.on_second(), Countdown::Idle);
        assert_eq!(clock.remaining(), 300);
    }

    #[test]
    fn test_counts_down_to_end() {
        let mut clock = MatchClock::new(3);
        clock.try_start(2, 2);
        assert_eq!(clock.on_second(), Countdown::Ticking(2));
        assert_eq!(clock.on_second(), Countdown::Ticking(1));
        assert!(!clock.take_end_report());
        assert_eq!(clock.on_second(), Countdown::Expired);
        assert!(clock.is_ended());
        assert!(!clock.is_started());
        assert_eq!(clock.remaining(), 0);
        assert_eq!(clock.on_second(), Countdown::Idle);
        assert_eq!(clock.remaining(), 0);
    }

    #[test]
    fn test_end_reported_once() {
        let mut clock = MatchClock::new(1);
        clock.try_start(2, 2);
        clock.on_second();
        assert!(clock.take_end_report());
        assert!(!clock.take_end_report());
    }

    #[test]
    fn test_ended_clock_never_restarts() {
        let mut clock = MatchClock::new(1);
        clock.try_start(2, 2);
        clock.on_second();
        assert!(!clock.try_start(5, 2));
        assert!(clock.is_ended());
    }
}
