use std::io::Write;
use std::sync::Mutex;

use crate::metrics::snapshot::ExtractionMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for extraction metrics snapshots.
///
/// Writes the Prometheus text exposition format so the output can be scraped
/// by Prometheus or forwarded to an OpenTelemetry collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send + Sync> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send + Sync> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_metric(&self, kind: &str, name: &str, value: u64) {
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_counter(&self, name: &str, value: u64) {
        self.write_metric("counter", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send + Sync> MetricsExporter<ExtractionMetricsSnapshot>
    for PrometheusTextExporter<W>
{
    fn export(&self, snapshot: &ExtractionMetricsSnapshot) {
        self.write_counter(
            &self.metric_name("extract_batch_calls_total"),
            snapshot.batch_calls,
        );
        self.write_counter(
            &self.metric_name("extract_empty_batches_total"),
            snapshot.empty_batches,
        );
        self.write_counter(
            &self.metric_name("extract_rejected_batches_total"),
            snapshot.rejected_batches,
        );
        self.write_counter(&self.metric_name("extract_records_total"), snapshot.records);
        self.write_counter(
            &self.metric_name("extract_words_received_total"),
            snapshot.words_received,
        );
        self.write_counter(
            &self.metric_name("extract_short_gap_streams_total"),
            snapshot.short_gap_streams,
        );
    }
}
