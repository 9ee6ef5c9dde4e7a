//! Metrics collection for table synchronization.
//!
//! Provides thread-safe counters for tracking how often interface tables
//! are rebuilt, skipped, published and reclaimed.

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

/// Counters shared by the filter engine and the sync drivers.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    /// Number of sync requests (single interface or as part of sync-all).
    pub syncs: Counter,
    /// Number of flush requests.
    pub flushes: Counter,
    /// Requests for interfaces with no registered table.
    pub not_of_interest: Counter,
    /// Tables swapped into the live configuration.
    pub published: Counter,
    /// Table builds abandoned because memory could not be reserved.
    pub alloc_failures: Counter,
    /// Total members across all published tables.
    pub members_published: Counter,
    /// Displaced tables destroyed after the barrier.
    pub tables_reclaimed: Counter,
    /// Whole-configuration loads.
    pub config_loads: Counter,
}

impl SyncMetrics {
    /// Creates a new metrics set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports all counters as key-value pairs.
    pub fn export(&self) -> Vec<(String, u64)> {
        vec![
            ("syncs".into(), self.syncs.get()),
            ("flushes".into(), self.flushes.get()),
            ("not_of_interest".into(), self.not_of_interest.get()),
            ("published".into(), self.published.get()),
            ("alloc_failures".into(), self.alloc_failures.get()),
            ("members_published".into(), self.members_published.get()),
            ("tables_reclaimed".into(), self.tables_reclaimed.get()),
            ("config_loads".into(), self.config_loads.get()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_basic() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);

        counter.inc();
        assert_eq!(counter.get(), 1);

        counter.add(10);
        assert_eq!(counter.get(), 11);
    }

    #[test]
    fn test_sync_metrics_export() {
        let metrics = SyncMetrics::new();

        metrics.syncs.add(3);
        metrics.published.inc();
        metrics.members_published.add(3);

        let exported = metrics.export();
        assert!(exported.contains(&("syncs".into(), 3)));
        assert!(exported.contains(&("published".into(), 1)));
        assert!(exported.contains(&("members_published".into(), 3)));
        assert!(exported.contains(&("flushes".into(), 0)));
    }
}
