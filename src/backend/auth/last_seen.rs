//! Last-seen throttle
//!
//! Bots hit the API constantly; writing `bots.last_seen_at` on every request
//! would turn reads into writes. `LastSeenThrottle` lets one write through
//! per bot per interval.
//!
//! The map lives in this process only. With several server instances each
//! one throttles on its own, so a bot may be written up to once per interval
//! per instance.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Rate limiter for `last_seen_at` writes keyed by (space, bot)
#[derive(Debug)]
pub struct LastSeenThrottle {
    interval: Duration,
    recorded: DashMap<(Uuid, Uuid), Instant>,
}

impl LastSeenThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            recorded: DashMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a write for this bot should happen at `now`
    ///
    /// Returns `true` at most once per interval per key and records `now`
    /// when it does.
    pub fn should_record(&self, bot_space_id: Uuid, bot_id: Uuid, now: Instant) -> bool {
        match self.recorded.entry((bot_space_id, bot_id)) {
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                true
            }
            Entry::Occupied(mut last) => {
                if now.saturating_duration_since(*last.get()) >= self.interval {
                    last.insert(now);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Forget keys whose last write is older than the interval
    pub fn prune(&self, now: Instant) {
        let interval = self.interval;
        self.recorded
            .retain(|_, last| now.saturating_duration_since(*last) < interval);
    }

    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_once_per_interval() {
        let throttle = LastSeenThrottle::new(Duration::from_secs(60));
        let (space, bot) = (Uuid::new_v4(), Uuid::new_v4());
        let start = Instant::now();

        assert!(throttle.should_record(space, bot, start));
        assert!(!throttle.should_record(space, bot, start + Duration::from_secs(1)));
        assert!(!throttle.should_record(space, bot, start + Duration::from_secs(59)));
        assert!(throttle.should_record(space, bot, start + Duration::from_secs(60)));
    }

    #[test]
    fn test_keys_are_independent() {
        let throttle = LastSeenThrottle::new(Duration::from_secs(60));
        let space = Uuid::new_v4();
        let now = Instant::now();
        assert!(throttle.should_record(space, Uuid::new_v4(), now));
        assert!(throttle.should_record(space, Uuid::new_v4(), now));
        assert_eq!(throttle.len(), 2);
    }

    #[test]
    fn test_prune_drops_stale_entries() {
        let throttle = LastSeenThrottle::new(Duration::from_secs(60));
        let space = Uuid::new_v4();
        let start = Instant::now();
        throttle.should_record(space, Uuid::new_v4(), start);
        throttle.should_record(space, Uuid::new_v4(), start + Duration::from_secs(30));

        throttle.prune(start + Duration::from_secs(61));
        assert_eq!(throttle.len(), 1);
        throttle.prune(start + Duration::from_secs(120));
        assert!(throttle.is_empty());
    }
}
