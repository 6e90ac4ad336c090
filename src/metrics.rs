//! Sync metrics and observability.
//!
//! One `SyncMetrics` is created per engine and shared by reference with the
//! dispatcher, the propagation worker and the background flows.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::sync::SyncTally;

#[derive(Debug, Default)]
pub struct SyncMetrics {
    /// Base-translation events accepted by the dispatcher
    events_published: AtomicUsize,

    /// Events that never reached a handler or were discarded as stale
    events_dropped: AtomicUsize,

    /// Events whose handler ran to completion
    events_applied: AtomicUsize,

    /// Records overwritten by any sync flow
    records_synced: AtomicUsize,

    /// Record writes that failed in any sync flow
    record_failures: AtomicUsize,

    reconcile_runs: AtomicUsize,

    backfill_runs: AtomicUsize,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_applied(&self) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold a convergence tally into the record counters
    pub fn record_tally(&self, tally: &SyncTally) {
        self.records_synced.fetch_add(tally.synced, Ordering::Relaxed);
        self.record_failures.fetch_add(tally.failed, Ordering::Relaxed);
    }

    pub fn record_reconcile_run(&self) {
        self.reconcile_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backfill_run(&self) {
        self.backfill_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        let published = self.events_published.load(Ordering::Relaxed);
        let applied = self.events_applied.load(Ordering::Relaxed);
        let event_apply_rate = if published > 0 {
            (applied as f64 / published as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            events_published: published,
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_applied: applied,
            event_apply_rate,
            records_synced: self.records_synced.load(Ordering::Relaxed),
            record_failures: self.record_failures.load(Ordering::Relaxed),
            reconcile_runs: self.reconcile_runs.load(Ordering::Relaxed),
            backfill_runs: self.backfill_runs.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of `SyncMetrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub events_published: usize,
    pub events_dropped: usize,
    pub events_applied: usize,

    /// Applied events as a percentage of published ones (0-100)
    pub event_apply_rate: f64,

    pub records_synced: usize,
    pub record_failures: usize,
    pub reconcile_runs: usize,
    pub backfill_runs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let report = SyncMetrics::new().report();
        assert_eq!(report.events_published, 0);
        assert_eq!(report.records_synced, 0);
        assert_eq!(report.event_apply_rate, 0.0);
    }

    #[test]
    fn test_event_counters() {
        let metrics = SyncMetrics::new();
        metrics.record_event_published();
        metrics.record_event_published();
        metrics.record_event_applied();
        metrics.record_event_dropped();

        let report = metrics.report();
        assert_eq!(report.events_published, 2);
        assert_eq!(report.events_applied, 1);
        assert_eq!(report.events_dropped, 1);
        assert_eq!(report.event_apply_rate, 50.0);
    }

    #[test]
    fn test_record_tally() {
        let metrics = SyncMetrics::new();
        metrics.record_tally(&SyncTally {
            synced: 5,
            unchanged: 2,
            skipped_pinned: 1,
            failed: 3,
        });

        let report = metrics.report();
        assert_eq!(report.records_synced, 5);
        assert_eq!(report.record_failures, 3);
    }

    #[test]
    fn test_instances_are_independent() {
        let a = SyncMetrics::new();
        let b = SyncMetrics::new();
        a.record_reconcile_run();

        assert_eq!(a.report().reconcile_runs, 1);
        assert_eq!(b.report().reconcile_runs, 0);
    }

    #[test]
    fn test_report_serializes() {
        let metrics = SyncMetrics::new();
        metrics.record_backfill_run();
        let json = serde_json::to_value(metrics.report()).expect("serialize");
        assert_eq!(json["backfill_runs"], 1);
    }
}
