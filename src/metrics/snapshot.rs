/// Point-in-time copy of extraction counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionMetricsSnapshot {
    pub batch_calls: u64,
    pub empty_batches: u64,
    pub rejected_batches: u64,

    pub records: u64,
    pub words_received: u64,
    pub short_gap_streams: u64, // streams with fewer accesses than gap slots
}

impl ExtractionMetricsSnapshot {
    /// Returns the mean number of records per accepted batch.
    pub fn records_per_batch(&self) -> f64 {
        let accepted = self.batch_calls.saturating_sub(self.rejected_batches);
        if accepted == 0 {
            0.0
        } else {
            self.records as f64 / accepted as f64
        }
    }
}
