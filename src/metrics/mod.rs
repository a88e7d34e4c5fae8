pub mod cell;
pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use metrics_impl::ExtractionMetrics;
pub use snapshot::ExtractionMetricsSnapshot;
pub use traits::{
    ExtractionMetricsRecorder, MetricsExporter, MetricsReset, MetricsSnapshotProvider,
};
