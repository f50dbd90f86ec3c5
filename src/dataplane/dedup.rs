//! Per-source duplicate suppression for Router Advertisements

use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::time::{Duration, Instant};

/// Default suppression window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Entries are pruned once the map grows past this many sources
const PRUNE_THRESHOLD: usize = 256;

/// Drops RAs that arrive from the same source within a short window.
///
/// The window is per source, so RAs from distinct routers never suppress
/// each other.
#[derive(Debug)]
pub struct DuplicateSuppressor {
    window: Duration,
    last_accepted: HashMap<Ipv6Addr, Instant>,
}

impl DuplicateSuppressor {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns false if `source` was accepted less than one window ago.
    /// Otherwise records `now` for `source` and returns true.
    pub fn should_process(&mut self, source: Ipv6Addr, now: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(&source) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        if self.last_accepted.len() >= PRUNE_THRESHOLD {
            self.prune(now);
        }
        self.last_accepted.insert(source, now);
        true
    }

    /// Forget sources whose window has expired
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.last_accepted
            .retain(|_, last| now.saturating_duration_since(*last) < window);
    }

    /// Number of sources currently tracked
    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }
}

impl Default for DuplicateSuppressor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_second_ra_within_window_suppressed() {
        let mut dedup = DuplicateSuppressor::default();
        let t0 = Instant::now();

        assert!(dedup.should_process(addr("fe80::1"), t0));
        assert!(!dedup.should_process(addr("fe80::1"), t0 + Duration::from_millis(999)));
    }

    #[test]
    fn test_window_boundary_accepts() {
        let mut dedup = DuplicateSuppressor::default();
        let t0 = Instant::now();

        assert!(dedup.should_process(addr("fe80::1"), t0));
        assert!(dedup.should_process(addr("fe80::1"), t0 + Duration::from_secs(1)));
    }

    #[test]
    fn test_suppressed_ra_does_not_extend_window() {
        let mut dedup = DuplicateSuppressor::default();
        let t0 = Instant::now();

        assert!(dedup.should_process(addr("fe80::1"), t0));
        assert!(!dedup.should_process(addr("fe80::1"), t0 + Duration::from_millis(600)));
        assert!(dedup.should_process(addr("fe80::1"), t0 + Duration::from_millis(1100)));
    }

    #[test]
    fn test_sources_are_independent() {
        let mut dedup = DuplicateSuppressor::default();
        let t0 = Instant::now();

        assert!(dedup.should_process(addr("fe80::1"), t0));
        assert!(dedup.should_process(addr("fe80::2"), t0));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_prune() {
        let mut dedup = DuplicateSuppressor::new(Duration::from_secs(2));
        let t0 = Instant::now();

        dedup.should_process(addr("fe80::1"), t0);
        dedup.should_process(addr("fe80::2"), t0 + Duration::from_secs(1));
        dedup.prune(t0 + Duration::from_millis(2500));

        assert_eq!(dedup.len(), 1);
        assert!(!dedup.should_process(addr("fe80::2"), t0 + Duration::from_millis(2500)));
    }

    #[test]
    fn test_prune_threshold_bounds_growth() {
        let mut dedup = DuplicateSuppressor::default();
        let t0 = Instant::now();

        for i in 0..PRUNE_THRESHOLD as u16 {
            dedup.should_process(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, i), t0);
        }
        assert_eq!(dedup.len(), PRUNE_THRESHOLD);

        dedup.should_process(addr("fe80::ffff:1"), t0 + Duration::from_secs(5));
        assert_eq!(dedup.len(), 1);
    }
}
