//! Trailing-edge debounce state machine
//!
//! `Idle -> Pending(deadline) -> Idle`. Every event pushes the deadline out
//! to `now + delay`; the action fires once, when a tick reaches the deadline.
//! Time is passed in, so the machine is driven by real or simulated clocks.

use std::time::Duration;
use tokio::time::Instant;

/// Debouncer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    /// No event since the last firing
    Idle,
    /// An action is scheduled for `deadline`
    Pending {
        /// When the action fires if no further events arrive
        deadline: Instant,
    },
}

/// Collapses bursts of events into one delayed action
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    state: DebounceState,
}

impl Debouncer {
    /// Create an idle debouncer
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: DebounceState::Idle,
        }
    }

    /// Configured delay
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Record an event, restarting any pending delay
    pub fn event(&mut self, now: Instant) {
        self.state = DebounceState::Pending {
            deadline: now + self.delay,
        };
    }

    /// Pending deadline, if any
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Idle => None,
            DebounceState::Pending { deadline } => Some(deadline),
        }
    }

    /// Advance the clock. Returns `true` exactly once per burst, when `now`
    /// has reached the pending deadline.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.state {
            DebounceState::Pending { deadline } if now >= deadline => {
                self.state = DebounceState::Idle;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1000);

    #[test]
    fn test_idle_never_fires() {
        let mut debouncer = Debouncer::new(DELAY);
        let start = Instant::now();
        assert!(!debouncer.tick(start + Duration::from_secs(60)));
        assert_eq!(debouncer.state(), DebounceState::Idle);
    }

    #[test]
    fn test_single_event_fires_after_delay() {
        let mut debouncer = Debouncer::new(DELAY);
        let start = Instant::now();
        debouncer.event(start);
        assert_eq!(debouncer.deadline(), Some(start + DELAY));
        assert!(!debouncer.tick(start + Duration::from_millis(999)));
        assert!(debouncer.tick(start + DELAY));
        assert_eq!(debouncer.state(), DebounceState::Idle);
        assert!(!debouncer.tick(start + DELAY * 2));
    }

    #[test]
    fn test_burst_collapses_into_one_firing_after_last_event() {
        let mut debouncer = Debouncer::new(DELAY);
        let start = Instant::now();
        let mut fired = 0;

        // Ten events, 20ms apart, with a clock tick between each.
        let mut last = start;
        for i in 0..10 {
            last = start + Duration::from_millis(20 * i);
            if debouncer.tick(last) {
                fired += 1;
            }
            debouncer.event(last);
        }
        assert_eq!(debouncer.deadline(), Some(last + DELAY));

        // Tick every 100ms for three seconds.
        let mut fired_at = None;
        for step in 1..=30 {
            let now = last + Duration::from_millis(100 * step);
            if debouncer.tick(now) {
                fired += 1;
                fired_at = Some(now);
            }
        }

        assert_eq!(fired, 1);
        assert_eq!(fired_at, Some(last + DELAY));
    }

    #[test]
    fn test_event_after_firing_starts_new_burst() {
        let mut debouncer = Debouncer::new(DELAY);
        let start = Instant::now();
        debouncer.event(start);
        assert!(debouncer.tick(start + DELAY));

        let again = start + DELAY * 3;
        debouncer.event(again);
        assert!(!debouncer.tick(again + Duration::from_millis(500)));
        assert!(debouncer.tick(again + DELAY));
    }
}
