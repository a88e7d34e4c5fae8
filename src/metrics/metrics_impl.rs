use crate::metrics::cell::MetricsCell;
use crate::metrics::snapshot::ExtractionMetricsSnapshot;
use crate::metrics::traits::{ExtractionMetricsRecorder, MetricsReset, MetricsSnapshotProvider};

#[derive(Debug, Default)]
pub struct ExtractionMetrics {
    pub batch_calls: MetricsCell,
    pub empty_batches: MetricsCell,
    pub rejected_batches: MetricsCell,
    pub records: MetricsCell,
    pub words_received: MetricsCell,
    pub short_gap_streams: MetricsCell,
}

impl ExtractionMetricsRecorder for ExtractionMetrics {
    #[inline]
    fn record_batch_call(&self) {
        self.batch_calls.incr();
    }

    #[inline]
    fn record_empty_batch(&self) {
        self.empty_batches.incr();
    }

    #[inline]
    fn record_rejected_batch(&self) {
        self.rejected_batches.incr();
    }

    #[inline]
    fn record_records(&self, n: u64) {
        self.records.add(n);
    }

    #[inline]
    fn record_words_received(&self, n: u64) {
        self.words_received.add(n);
    }

    #[inline]
    fn record_short_gap_stream(&self) {
        self.short_gap_streams.incr();
    }
}

impl MetricsSnapshotProvider<ExtractionMetricsSnapshot> for ExtractionMetrics {
    fn snapshot(&self) -> ExtractionMetricsSnapshot {
        ExtractionMetricsSnapshot {
            batch_calls: self.batch_calls.get(),
            empty_batches: self.empty_batches.get(),
            rejected_batches: self.rejected_batches.get(),
            records: self.records.get(),
            words_received: self.words_received.get(),
            short_gap_streams: self.short_gap_streams.get(),
        }
    }
}

impl MetricsReset for ExtractionMetrics {
    fn reset_metrics(&self) {
        self.batch_calls.reset();
        self.empty_batches.reset();
        self.rejected_batches.reset();
        self.records.reset();
        self.words_received.reset();
        self.short_gap_streams.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counts() {
        let metrics = ExtractionMetrics::default();
        metrics.record_batch_call();
        metrics.record_batch_call();
        metrics.record_rejected_batch();
        metrics.record_records(5);
        metrics.record_words_received(40);
        metrics.record_short_gap_stream();

        let snap = metrics.snapshot();
        assert_eq!(snap.batch_calls, 2);
        assert_eq!(snap.rejected_batches, 1);
        assert_eq!(snap.records, 5);
        assert_eq!(snap.words_received, 40);
        assert_eq!(snap.short_gap_streams, 1);
        assert_eq!(snap.records_per_batch(), 5.0);
    }

    #[test]
    fn reset_zeroes_every_counter() {
        let metrics = ExtractionMetrics::default();
        metrics.record_batch_call();
        metrics.record_empty_batch();
        metrics.record_records(3);
        metrics.reset_metrics();
        assert_eq!(metrics.snapshot(), ExtractionMetricsSnapshot::default());
    }

    #[test]
    fn counters_are_shared_across_threads() {
        let metrics = std::sync::Arc::new(ExtractionMetrics::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_records(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().records, 4000);
    }
}
