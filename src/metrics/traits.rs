//! # Metrics Trait Hierarchy
//!
//! Separates *recording*, *snapshotting*, and *export* into small traits so
//! the extractor only ever increments counters and never knows who reads
//! them.
//!
//! ## Architecture
//!
//! ```text
//!              ┌─────────────────────────────────────┐
//!              │      ExtractionMetricsRecorder      │
//!              │  batch / rejected / records / words │
//!              └──────────────────┬──────────────────┘
//!                                 │ implemented by
//!                                 ▼
//!                      ┌──────────────────────┐
//!                      │  ExtractionMetrics   │ (atomic cells, &self)
//!                      └──────────┬───────────┘
//!                                 │
//!   Consumption (decoupled from recording):
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (bench/test)                 │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Recording takes `&self` because one extractor is shared by every worker
//! of the extraction service.

/// Counters for feature extraction.
pub trait ExtractionMetricsRecorder {
    /// A call to `extract` started.
    fn record_batch_call(&self);
    /// A call received an empty batch.
    fn record_empty_batch(&self);
    /// A call failed validation.
    fn record_rejected_batch(&self);
    /// `n` feature records were produced.
    fn record_records(&self, n: u64);
    /// `n` history words arrived in a batch, counting both streams.
    fn record_words_received(&self, n: u64);
    /// A stream held fewer accesses than gap slots.
    fn record_short_gap_stream(&self);
}

/// Snapshot provider for bench/testing.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
