//! Frame-polled recurring timers.
//!
//! The control surface runs on a single event loop (the egui frame loop), so the
//! recurring timers it needs (debounce tick, heartbeat) are not spawned tasks but
//! deadlines checked against an injected `Instant`. Injecting the clock keeps every
//! timer-driven behavior testable without sleeping.

use std::time::{Duration, Instant};

/// Recurring timer with a fixed period
#[derive(Debug, Clone)]
pub struct Ticker {
    /// Time between two ticks
    period: Duration,

    /// Deadline of the next tick
    next_tick: Instant,
}

impl Ticker {
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// Creates a ticker whose first tick is due one period after `now`
    pub fn new(period: Duration, now: Instant) -> Self {
        let period = period.max(Self::MIN_PERIOD);
        Self {
            period,
            next_tick: now + period,
        }
    }

    /// Creates a ticker firing `rate_hz` times per second
    pub fn with_rate(rate_hz: u32, now: Instant) -> Self {
        let rate_hz = rate_hz.max(1);
        Self::new(
            Duration::from_nanos(1_000_000_000 / u64::from(rate_hz)),
            now,
        )
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Reports whether at least one tick elapsed since the last poll.
    ///
    /// Missed ticks collapse into one: a frame that arrives late fires once and the
    /// deadline moves to the next period boundary after `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_tick {
            return false;
        }

        while self.next_tick <= now {
            self.next_tick += self.period;
        }
        true
    }

    /// Time left until the next tick, zero if one is already due
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_tick.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_period() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(10), start);

        assert!(!ticker.poll(start));
        assert!(!ticker.poll(start + Duration::from_millis(9)));
        assert!(ticker.poll(start + Duration::from_millis(10)));
        assert!(!ticker.poll(start + Duration::from_millis(15)));
        assert!(ticker.poll(start + Duration::from_millis(21)));
    }

    #[test]
    fn late_poll_collapses_missed_ticks() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(10), start);

        assert!(ticker.poll(start + Duration::from_millis(55)));
        assert!(!ticker.poll(start + Duration::from_millis(59)));
        assert_eq!(
            ticker.remaining(start + Duration::from_millis(59)),
            Duration::from_millis(1)
        );
        assert!(ticker.poll(start + Duration::from_millis(60)));
    }

    #[test]
    fn rate_is_converted_to_period() {
        let ticker = Ticker::with_rate(60, Instant::now());
        assert_eq!(ticker.period(), Duration::from_nanos(16_666_666));

        let zero = Ticker::with_rate(0, Instant::now());
        assert_eq!(zero.period(), Duration::from_secs(1));
    }
}
