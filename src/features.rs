//! Feature extraction over packed access histories.
//!
//! Turns a batch of [`HistoryPair`]s into a [`FeatureTable`]: one
//! [`FeatureRecord`] per key, each holding a read block and a write block of
//! identical shape.
//!
//! ## Architecture
//!
//! ```text
//!   batch: &[HistoryPair]                       FeatureTable
//!   ─────────────────────                       ────────────
//!   [0] read ──► StreamFeatures ─┐
//!       write ─► StreamFeatures ─┴─► FeatureRecord [0]
//!   [1] read ──► StreamFeatures ─┐
//!       write ─► StreamFeatures ─┴─► FeatureRecord [1]
//!   ...                                           ...
//!
//!   StreamFeatures (per stream, 15 columns)
//!   ┌──────────────────────┬───────────────────────┬──────────────────────────┐
//!   │ window_counts [4]    │ gaps [6]              │ gap_deltas [5]           │
//!   │ k = 30, 50, 100, 200 │ first 6 access gaps   │ gaps[i] - gaps[i + 1]    │
//!   └──────────────────────┴───────────────────────┴──────────────────────────┘
//!   + gap_valid [6] companion mask (not a column)
//! ```
//!
//! ## Column Order
//!
//! [`FEATURE_COLUMNS`] lists all [`FEATURE_WIDTH`] columns; the read block
//! comes first, then the write block. [`FeatureRecord::to_row`] flattens a
//! record in exactly that order.
//!
//! ## Unfilled Gaps
//!
//! A stream with fewer than [`GAP_COUNT`] accesses reports 0 in the trailing
//! gap slots and `false` in the matching `gap_valid` entries. Deltas that
//! touch an unfilled slot are computed from those zeros as well, so consumers
//! that care must consult `gap_valid`.
//!
//! ## Example Usage
//!
//! ```
//! use staleness::ds::HistoryPair;
//! use staleness::features::{FEATURE_WIDTH, extract_features};
//!
//! let batch = vec![
//!     HistoryPair::from_words(vec![1, 2, 4], vec![0]),
//!     HistoryPair::from_words(vec![0, 0, 0], vec![0b11, 0, 0]),
//! ];
//!
//! let table = extract_features(&batch).unwrap();
//! assert_eq!(table.shape(), (2, FEATURE_WIDTH));
//!
//! let first = table.get(0).unwrap();
//! assert_eq!(first.read.window_counts, [1, 1, 2, 3]);
//! assert_eq!(first.read.gaps, [1, 65, 65, 0, 0, 0]);
//! assert_eq!(first.read.gap_deltas, [-64, 0, 65, 0, 0]);
//! ```
//!
//! ## Thread Safety
//!
//! [`FeatureExtractor`] is `Send + Sync` and holds no state besides optional
//! atomic metrics. With the `concurrency` feature,
//! [`FeatureExtractor::extract_parallel`] spreads a batch across the rayon
//! pool and returns the same table as [`FeatureExtractor::extract`].

use log::{debug, warn};
#[cfg(feature = "concurrency")]
use rayon::prelude::*;

use crate::ds::access_history::{AccessHistory, HistoryPair};
use crate::error::HistoryError;
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::ExtractionMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::ExtractionMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{ExtractionMetricsRecorder, MetricsReset, MetricsSnapshotProvider};

/// Window sizes, in steps, of the access-count features.
pub const WINDOW_SIZES: [usize; 4] = [30, 50, 100, 200];

/// Number of inter-access gaps per stream.
pub const GAP_COUNT: usize = 6;

/// Number of first-order gap differences per stream.
pub const DELTA_COUNT: usize = GAP_COUNT - 1;

/// Columns per stream.
pub const STREAM_WIDTH: usize = WINDOW_SIZES.len() + GAP_COUNT + DELTA_COUNT;

/// Columns per record (read block + write block).
pub const FEATURE_WIDTH: usize = 2 * STREAM_WIDTH;

/// Column names in row order.
pub const FEATURE_COLUMNS: [&str; FEATURE_WIDTH] = [
    "read_arrive_times_p30",
    "read_arrive_times_p50",
    "read_arrive_times_p100",
    "read_arrive_times_p200",
    "read_p_delta0",
    "read_p_delta1",
    "read_p_delta2",
    "read_p_delta3",
    "read_p_delta4",
    "read_p_delta5",
    "read_p_delta0_delta1",
    "read_p_delta1_delta2",
    "read_p_delta2_delta3",
    "read_p_delta3_delta4",
    "read_p_delta4_delta5",
    "write_arrive_times_p30",
    "write_arrive_times_p50",
    "write_arrive_times_p100",
    "write_arrive_times_p200",
    "write_p_delta0",
    "write_p_delta1",
    "write_p_delta2",
    "write_p_delta3",
    "write_p_delta4",
    "write_p_delta5",
    "write_p_delta0_delta1",
    "write_p_delta1_delta2",
    "write_p_delta2_delta3",
    "write_p_delta3_delta4",
    "write_p_delta4_delta5",
];

/// Access stream of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Read,
    Write,
}

impl Stream {
    /// Returns the offset of this stream's block within a row.
    pub const fn column_offset(self) -> usize {
        match self {
            Stream::Read => 0,
            Stream::Write => STREAM_WIDTH,
        }
    }
}

// ---------------------------------------------------------------------------
// StreamFeatures
// ---------------------------------------------------------------------------

/// Features of one access stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamFeatures {
    /// Accesses within each of [`WINDOW_SIZES`], in that order.
    pub window_counts: [u32; WINDOW_SIZES.len()],
    /// Distances between the first [`GAP_COUNT`] accesses, most recent first.
    pub gaps: [u64; GAP_COUNT],
    /// `true` where `gaps` holds a real distance.
    pub gap_valid: [bool; GAP_COUNT],
    /// `gaps[i] - gaps[i + 1]`.
    pub gap_deltas: [i64; DELTA_COUNT],
}

impl StreamFeatures {
    /// Computes the features of one history.
    ///
    /// # Example
    ///
    /// ```
    /// use staleness::ds::AccessHistory;
    /// use staleness::features::StreamFeatures;
    ///
    /// let features = StreamFeatures::from_history(&AccessHistory::new(vec![0b101]));
    /// assert_eq!(features.window_counts, [2, 2, 2, 2]);
    /// assert_eq!(features.gaps, [1, 2, 0, 0, 0, 0]);
    /// assert_eq!(features.gap_filled(), 2);
    /// assert_eq!(features.gap_deltas, [-1, 2, 0, 0, 0]);
    /// ```
    pub fn from_history(history: &AccessHistory) -> Self {
        let mut window_counts = [0u32; WINDOW_SIZES.len()];
        for (count, &k) in window_counts.iter_mut().zip(WINDOW_SIZES.iter()) {
            *count = history.windowed_count(k);
        }

        let sequence = history.gaps(GAP_COUNT);
        let mut gaps = [0u64; GAP_COUNT];
        gaps.copy_from_slice(sequence.values());
        let mut gap_valid = [false; GAP_COUNT];
        for (i, valid) in gap_valid.iter_mut().enumerate() {
            *valid = sequence.is_valid(i);
        }

        let mut gap_deltas = [0i64; DELTA_COUNT];
        for (i, delta) in gap_deltas.iter_mut().enumerate() {
            *delta = signed(gaps[i]) - signed(gaps[i + 1]);
        }

        Self {
            window_counts,
            gaps,
            gap_valid,
            gap_deltas,
        }
    }

    /// Returns how many gap slots hold a real distance.
    pub fn gap_filled(&self) -> usize {
        self.gap_valid.iter().take_while(|&&valid| valid).count()
    }

    /// Returns `true` if the stream had at least [`GAP_COUNT`] accesses.
    pub fn has_full_gaps(&self) -> bool {
        self.gap_filled() == GAP_COUNT
    }

    /// Flattens this block in column order.
    pub fn to_row(&self) -> [i64; STREAM_WIDTH] {
        let mut row = [0i64; STREAM_WIDTH];
        self.write_row(&mut row);
        row
    }

    fn write_row(&self, out: &mut [i64]) {
        let (counts, rest) = out.split_at_mut(WINDOW_SIZES.len());
        let (gaps, deltas) = rest.split_at_mut(GAP_COUNT);
        for (dst, &src) in counts.iter_mut().zip(self.window_counts.iter()) {
            *dst = i64::from(src);
        }
        for (dst, &src) in gaps.iter_mut().zip(self.gaps.iter()) {
            *dst = signed(src);
        }
        deltas.copy_from_slice(&self.gap_deltas);
    }
}

// gaps never exceed the history length in bits
#[inline]
fn signed(gap: u64) -> i64 {
    i64::try_from(gap).unwrap_or(i64::MAX)
}

// ---------------------------------------------------------------------------
// FeatureRecord
// ---------------------------------------------------------------------------

/// Features of one cache key: read block then write block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureRecord {
    pub read: StreamFeatures,
    pub write: StreamFeatures,
}

impl FeatureRecord {
    /// Computes both blocks of one pair, each from its own stream.
    pub fn from_pair(pair: &HistoryPair) -> Self {
        Self {
            read: StreamFeatures::from_history(&pair.read),
            write: StreamFeatures::from_history(&pair.write),
        }
    }

    /// Returns the block for `stream`.
    pub fn stream(&self, stream: Stream) -> &StreamFeatures {
        match stream {
            Stream::Read => &self.read,
            Stream::Write => &self.write,
        }
    }

    /// Flattens the record in [`FEATURE_COLUMNS`] order.
    ///
    /// # Example
    ///
    /// ```
    /// use staleness::ds::HistoryPair;
    /// use staleness::features::{FEATURE_COLUMNS, FeatureRecord};
    ///
    /// let record = FeatureRecord::from_pair(&HistoryPair::from_words(vec![1], vec![6]));
    /// let row = record.to_row();
    ///
    /// let p30 = FEATURE_COLUMNS.iter().position(|&c| c == "write_arrive_times_p30").unwrap();
    /// assert_eq!(row[p30], 2);
    /// ```
    pub fn to_row(&self) -> [i64; FEATURE_WIDTH] {
        let mut row = [0i64; FEATURE_WIDTH];
        let (read, write) = row.split_at_mut(STREAM_WIDTH);
        self.read.write_row(read);
        self.write.write_row(write);
        row
    }
}

// ---------------------------------------------------------------------------
// FeatureTable
// ---------------------------------------------------------------------------

/// Ordered feature records, one per input pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureTable {
    records: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<FeatureRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `(rows, FEATURE_WIDTH)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.records.len(), FEATURE_WIDTH)
    }

    pub fn get(&self, index: usize) -> Option<&FeatureRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FeatureRecord> {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureRecord> {
        self.records.iter()
    }

    /// Returns every record flattened in column order.
    pub fn rows(&self) -> Vec<[i64; FEATURE_WIDTH]> {
        self.records.iter().map(FeatureRecord::to_row).collect()
    }

    /// Returns the position of a named column, for adapters that address
    /// columns by name.
    pub fn column_index(name: &str) -> Option<usize> {
        FEATURE_COLUMNS.iter().position(|&column| column == name)
    }

    /// Returns one column across all rows.
    ///
    /// Returns `None` if `index >= FEATURE_WIDTH`.
    pub fn column(&self, index: usize) -> Option<Vec<i64>> {
        if index >= FEATURE_WIDTH {
            return None;
        }
        Some(self.records.iter().map(|r| r.to_row()[index]).collect())
    }
}

impl FromIterator<FeatureRecord> for FeatureTable {
    fn from_iter<I: IntoIterator<Item = FeatureRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureTable {
    type Item = FeatureRecord;
    type IntoIter = std::vec::IntoIter<FeatureRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureTable {
    type Item = &'a FeatureRecord;
    type IntoIter = std::slice::Iter<'a, FeatureRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// FeatureExtractor
// ---------------------------------------------------------------------------

/// Extracts a [`FeatureTable`] from a batch of histories.
///
/// # Example
///
/// ```
/// use staleness::ds::HistoryPair;
/// use staleness::features::FeatureExtractor;
///
/// let extractor = FeatureExtractor::new();
/// let batch: Vec<HistoryPair> = (1..=5u64)
///     .map(|i| HistoryPair::from_words(vec![i], vec![i + 5]))
///     .collect();
///
/// let table = extractor.extract(&batch).unwrap();
/// assert_eq!(table.len(), 5);
/// assert_eq!(table, extractor.extract(&batch).unwrap());
/// ```
#[derive(Debug, Default)]
pub struct FeatureExtractor {
    #[cfg(feature = "metrics")]
    metrics: ExtractionMetrics,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts one record per pair, in input order.
    ///
    /// Streams are computed independently, so the read and write histories
    /// of a pair may track different windows. Fails only on a history that
    /// breaks its own window invariant (see [`AccessHistory::validate`]). An
    /// empty batch yields an empty table.
    pub fn extract(&self, batch: &[HistoryPair]) -> Result<FeatureTable, HistoryError> {
        self.begin(batch)?;
        let records: Vec<FeatureRecord> = batch.iter().map(|pair| self.record_for(pair)).collect();
        self.finish(batch, &records);
        Ok(FeatureTable::from_records(records))
    }

    /// Same as [`extract`](Self::extract), computed on the rayon pool.
    ///
    /// Validation runs up front, so the reported error is the same one
    /// `extract` would report.
    #[cfg(feature = "concurrency")]
    pub fn extract_parallel(&self, batch: &[HistoryPair]) -> Result<FeatureTable, HistoryError> {
        self.begin(batch)?;
        let records: Vec<FeatureRecord> =
            batch.par_iter().map(|pair| self.record_for(pair)).collect();
        self.finish(batch, &records);
        Ok(FeatureTable::from_records(records))
    }

    fn begin(&self, batch: &[HistoryPair]) -> Result<(), HistoryError> {
        #[cfg(feature = "metrics")]
        self.metrics.record_batch_call();

        if batch.is_empty() {
            #[cfg(feature = "metrics")]
            self.metrics.record_empty_batch();
            return Ok(());
        }

        for (index, pair) in batch.iter().enumerate() {
            let checked = pair.read.validate().and_then(|()| pair.write.validate());
            if let Err(err) = checked {
                warn!("rejecting batch of {} histories at index {}: {}", batch.len(), index, err);
                #[cfg(feature = "metrics")]
                self.metrics.record_rejected_batch();
                return Err(err);
            }
        }
        Ok(())
    }

    #[inline]
    fn record_for(&self, pair: &HistoryPair) -> FeatureRecord {
        let record = FeatureRecord::from_pair(pair);
        #[cfg(feature = "metrics")]
        {
            if !record.read.has_full_gaps() {
                self.metrics.record_short_gap_stream();
            }
            if !record.write.has_full_gaps() {
                self.metrics.record_short_gap_stream();
            }
        }
        record
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn finish(&self, batch: &[HistoryPair], records: &[FeatureRecord]) {
        debug!("extracted {} feature records", records.len());
        #[cfg(feature = "metrics")]
        {
            let words: usize = batch
                .iter()
                .map(|pair| pair.read.word_count() + pair.write.word_count())
                .sum();
            self.metrics.record_records(records.len() as u64);
            self.metrics.record_words_received(words as u64);
        }
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> ExtractionMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(feature = "metrics")]
impl MetricsSnapshotProvider<ExtractionMetricsSnapshot> for FeatureExtractor {
    fn snapshot(&self) -> ExtractionMetricsSnapshot {
        self.metrics_snapshot()
    }
}

#[cfg(feature = "metrics")]
impl MetricsReset for FeatureExtractor {
    fn reset_metrics(&self) {
        self.metrics.reset_metrics();
    }
}

/// Extracts one record per pair, in input order.
///
/// Stateless shorthand for [`FeatureExtractor::extract`].
pub fn extract_features(batch: &[HistoryPair]) -> Result<FeatureTable, HistoryError> {
    FeatureExtractor::new().extract(batch)
}
