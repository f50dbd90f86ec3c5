//! Counters for the listener pipeline.
//!
//! Lock-free so the capture task, the solicitation task and the shutdown
//! summary can all touch them through a shared `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter by 1.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds a value to the counter.
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Gets the current value of the counter.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Statistics for one listener instance.
#[derive(Debug, Default)]
pub struct ListenerStats {
    // Capture
    /// Frames handed to the pipeline.
    pub frames_received: Counter,
    /// Bytes handed to the pipeline.
    pub bytes_received: Counter,
    /// Frames that were not Router Advertisements.
    pub not_router_advertisement: Counter,

    // Router Advertisements
    /// RAs dropped by the duplicate window.
    pub ra_suppressed: Counter,
    /// RAs whose options were decoded.
    pub ra_processed: Counter,
    /// Options skipped because they could not be decoded.
    pub options_malformed: Counter,
    /// Prefixes and routes outside the ULA range.
    pub non_ula_ignored: Counter,

    // Route decisions
    /// Bindings seen for the first time.
    pub routes_new: Counter,
    /// Repeats of an already applied binding.
    pub routes_unchanged: Counter,
    /// Known prefixes advertised by a different router.
    pub routes_router_changed: Counter,
    /// Successful collaborator runs.
    pub apply_succeeded: Counter,
    /// Failed collaborator runs.
    pub apply_failed: Counter,

    // Solicitation
    /// Router Solicitations transmitted.
    pub solicitations_sent: Counter,
    /// Router Solicitations that failed to send.
    pub solicitation_errors: Counter,
}

impl ListenerStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame handed to the pipeline.
    pub fn record_frame(&self, bytes: usize) {
        self.frames_received.inc();
        self.bytes_received.add(bytes as u64);
    }

    /// Exports all counters as key-value pairs.
    pub fn export(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("frames_received", self.frames_received.get()),
            ("bytes_received", self.bytes_received.get()),
            (
                "not_router_advertisement",
                self.not_router_advertisement.get(),
            ),
            ("ra_suppressed", self.ra_suppressed.get()),
            ("ra_processed", self.ra_processed.get()),
            ("options_malformed", self.options_malformed.get()),
            ("non_ula_ignored", self.non_ula_ignored.get()),
            ("routes_new", self.routes_new.get()),
            ("routes_unchanged", self.routes_unchanged.get()),
            ("routes_router_changed", self.routes_router_changed.get()),
            ("apply_succeeded", self.apply_succeeded.get()),
            ("apply_failed", self.apply_failed.get()),
            ("solicitations_sent", self.solicitations_sent.get()),
            ("solicitation_errors", self.solicitation_errors.get()),
        ]
    }
}
