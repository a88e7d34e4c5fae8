//! Packed access history for one stream of one cache key.
//!
//! An [`AccessHistory`] is an immutable bit-vector over discrete time steps.
//! Bit `i` is set iff an access happened `i` steps ago, so bit 0 of word 0 is
//! the most recent step.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                    AccessHistory (words = [1, 2, 4])                        │
//! │                                                                             │
//! │   word 0 (steps 0..63)     word 1 (steps 64..127)   word 2 (steps 128..191) │
//! │   ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐    │
//! │   │ ...0000000000001 │     │ ...0000000000010 │     │ ...0000000000100 │    │
//! │   └──────────────────┘     └──────────────────┘     └──────────────────┘    │
//! │            ▲                         ▲                         ▲            │
//! │         step 0                    step 65                   step 130        │
//! │                                                                             │
//! │   windowed_count(66) = popcount(word 0) + popcount(word 1 & 0b11) = 2       │
//! │                                                                             │
//! │   gaps(3): anchor at -1                                                     │
//! │     step 0   → 0 - (-1)  = 1                                                │
//! │     step 65  → 65 - 0    = 65                                               │
//! │     step 130 → 130 - 65  = 65                                               │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`AccessHistory`]: Packed bit-vector plus the window it tracks
//! - [`GapSequence`]: Fixed-length gap values with a validity mask
//! - [`HistoryPair`]: Read and write histories of one key
//!
//! ## Operations
//!
//! | Operation                        | Description                        | Complexity  |
//! |----------------------------------|------------------------------------|-------------|
//! | [`windowed_count`]               | Accesses in the last `k` steps     | O(⌈k/64⌉)   |
//! | [`gaps`]                         | Distances between first `k` accesses | O(words + k) |
//! | [`access_count`]                 | Total accesses in the history      | O(words)    |
//!
//! [`windowed_count`]: AccessHistory::windowed_count
//! [`gaps`]: AccessHistory::gaps
//! [`access_count`]: AccessHistory::access_count
//!
//! ## Example Usage
//!
//! ```
//! use staleness::ds::AccessHistory;
//!
//! let history = AccessHistory::new(vec![1, 2, 4]);
//!
//! assert_eq!(history.windowed_count(65), 1);
//! assert_eq!(history.windowed_count(66), 2);
//!
//! let gaps = history.gaps(4);
//! assert_eq!(gaps.values(), &[1, 65, 65, 0]);
//! assert_eq!(gaps.filled(), 3);
//! assert!(!gaps.is_valid(3));
//! ```
//!
//! ## Thread Safety
//!
//! `AccessHistory` is immutable after construction and is `Send + Sync`; any
//! number of threads may read the same history concurrently.

use crate::bits::{self, WORD_BITS};
use crate::error::HistoryError;

/// Immutable packed bit-vector of accesses, most recent step first.
///
/// # Example
///
/// ```
/// use staleness::ds::AccessHistory;
///
/// let history = AccessHistory::with_window(vec![0b1001], 30).unwrap();
/// assert_eq!(history.window_bits(), 30);
/// assert_eq!(history.access_count(), 2);
/// assert_eq!(history.gaps(2).values(), &[1, 3]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AccessHistory {
    words: Vec<u64>,
    window_bits: usize,
}

impl AccessHistory {
    /// Creates a history whose window spans every stored word.
    pub fn new(words: Vec<u64>) -> Self {
        let window_bits = words.len() * WORD_BITS;
        Self { words, window_bits }
    }

    /// Creates a history tracking exactly `window_bits` time steps.
    ///
    /// Fails if `words` is not exactly `ceil(window_bits / 64)` long, or if
    /// any bit at or beyond `window_bits` is set.
    ///
    /// # Example
    ///
    /// ```
    /// use staleness::ds::AccessHistory;
    /// use staleness::error::HistoryError;
    ///
    /// let err = AccessHistory::with_window(vec![0], 100).unwrap_err();
    /// assert!(matches!(err, HistoryError::WordCountMismatch { expected_words: 2, .. }));
    /// ```
    pub fn with_window(words: Vec<u64>, window_bits: usize) -> Result<Self, HistoryError> {
        let history = Self { words, window_bits };
        history.validate()?;
        Ok(history)
    }

    /// Checks that the stored words cover the window exactly and that no bit
    /// at or beyond `window_bits` is set.
    ///
    /// Every public constructor upholds this; extraction re-checks it before
    /// reading a batch.
    pub fn validate(&self) -> Result<(), HistoryError> {
        let window_bits = self.window_bits;
        let expected_words = bits::words_for_bits(window_bits);
        if self.words.len() != expected_words {
            return Err(HistoryError::WordCountMismatch {
                window_bits,
                expected_words,
                actual_words: self.words.len(),
            });
        }
        let rem = window_bits % WORD_BITS;
        if rem != 0 {
            if let Some(&last) = self.words.last() {
                if last & !bits::low_mask(rem) != 0 {
                    return Err(HistoryError::BitsBeyondWindow { window_bits });
                }
            }
        }
        Ok(())
    }

    /// Creates a history from two's-complement words as carried by `int64` wire fields.
    ///
    /// Bit patterns are preserved exactly; a negative word simply has step 63
    /// of its range set.
    ///
    /// # Example
    ///
    /// ```
    /// use staleness::ds::AccessHistory;
    ///
    /// let history = AccessHistory::from_signed_words(&[-1]);
    /// assert_eq!(history.access_count(), 64);
    /// ```
    pub fn from_signed_words(words: &[i64]) -> Self {
        Self::new(words.iter().map(|&w| w as u64).collect())
    }

    /// Skips validation; callers guarantee the `with_window` invariants.
    pub(crate) fn from_trusted(words: Vec<u64>, window_bits: usize) -> Self {
        debug_assert_eq!(words.len(), bits::words_for_bits(window_bits));
        Self { words, window_bits }
    }

    /// Creates an all-zero history tracking `window_bits` steps.
    pub fn empty(window_bits: usize) -> Self {
        Self {
            words: vec![0; bits::words_for_bits(window_bits)],
            window_bits,
        }
    }

    /// Returns the packed words, word 0 first.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Returns the number of time steps this history tracks.
    pub fn window_bits(&self) -> usize {
        self.window_bits
    }

    /// Returns the number of stored words.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if no access is recorded.
    pub fn is_idle(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns the total number of recorded accesses.
    pub fn access_count(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Returns `true` if an access happened `step` steps ago.
    pub fn accessed_at(&self, step: usize) -> bool {
        self.words
            .get(step / WORD_BITS)
            .is_some_and(|w| (w >> (step % WORD_BITS)) & 1 == 1)
    }

    /// Returns how many steps ago the most recent access happened.
    pub fn most_recent_access(&self) -> Option<u64> {
        bits::set_bit_positions(&self.words).next()
    }

    /// Counts accesses among the `k` most recent steps.
    ///
    /// `k = 0` yields 0. Steps beyond the stored words count as idle, so a
    /// window larger than the history counts only what is stored.
    ///
    /// # Example
    ///
    /// ```
    /// use staleness::ds::AccessHistory;
    ///
    /// let history = AccessHistory::new(vec![1, 2, 4]);
    /// assert_eq!(history.windowed_count(0), 0);
    /// assert_eq!(history.windowed_count(64), 1);
    /// assert_eq!(history.windowed_count(192), 3);
    /// assert_eq!(history.windowed_count(10_000), 3);
    /// ```
    pub fn windowed_count(&self, k: usize) -> u32 {
        bits::windowed_count(&self.words, k)
    }

    /// Returns the distances between the first `k` accesses, most recent first.
    ///
    /// The first distance is measured from a virtual anchor one step before
    /// step 0, so an access at step 0 has distance 1. When fewer than `k`
    /// accesses exist, the remaining slots hold 0 and are reported invalid by
    /// the returned [`GapSequence`].
    ///
    /// # Example
    ///
    /// ```
    /// use staleness::ds::AccessHistory;
    ///
    /// let history = AccessHistory::new(vec![1, 2, 4]);
    /// assert_eq!(history.gaps(1).values(), &[1]);
    /// assert_eq!(history.gaps(2).values(), &[1, 65]);
    /// assert_eq!(history.gaps(3).values(), &[1, 65, 65]);
    /// ```
    pub fn gaps(&self, k: usize) -> GapSequence {
        let mut values = vec![0u64; k];
        let mut filled = 0;
        // position -1 is the virtual anchor; shift by one to stay unsigned
        let mut last_one_pos_plus_one = 0u64;

        for pos in bits::set_bit_positions(&self.words).take(k) {
            values[filled] = pos + 1 - last_one_pos_plus_one;
            last_one_pos_plus_one = pos + 1;
            filled += 1;
        }

        GapSequence { values, filled }
    }
}

impl From<Vec<u64>> for AccessHistory {
    fn from(words: Vec<u64>) -> Self {
        Self::new(words)
    }
}

impl From<&[u64]> for AccessHistory {
    fn from(words: &[u64]) -> Self {
        Self::new(words.to_vec())
    }
}

// ---------------------------------------------------------------------------
// GapSequence
// ---------------------------------------------------------------------------

/// Fixed-length gap values produced by [`AccessHistory::gaps`].
///
/// Slots `0..filled()` hold real distances (always `>= 1`); the rest hold 0
/// and are invalid. A 0 never means "no advancement".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GapSequence {
    values: Vec<u64>,
    filled: usize,
}

impl GapSequence {
    /// Returns all `k` slots, including zero-filled ones.
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Returns the number of slots backed by an actual access.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Returns the requested number of gaps.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if zero gaps were requested.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `true` if slot `i` holds a real distance.
    pub fn is_valid(&self, i: usize) -> bool {
        i < self.filled
    }

    /// Returns the validity of every slot.
    pub fn validity(&self) -> Vec<bool> {
        (0..self.values.len()).map(|i| self.is_valid(i)).collect()
    }

    /// Returns only the filled slots.
    pub fn valid_values(&self) -> &[u64] {
        &self.values[..self.filled]
    }

    /// Consumes the sequence, returning the raw slot values.
    pub fn into_values(self) -> Vec<u64> {
        self.values
    }
}

// ---------------------------------------------------------------------------
// HistoryPair
// ---------------------------------------------------------------------------

/// Read and write histories of one cache key.
///
/// The two streams are independent: extraction accepts a pair whose windows
/// differ. Producers that keep both streams on one clock can assert that with
/// [`check_same_window`](Self::check_same_window).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct HistoryPair {
    pub read: AccessHistory,
    pub write: AccessHistory,
}

impl HistoryPair {
    pub fn new(read: AccessHistory, write: AccessHistory) -> Self {
        Self { read, write }
    }

    /// Builds a pair from raw word vectors, each spanning all of its words.
    ///
    /// # Example
    ///
    /// ```
    /// use staleness::ds::HistoryPair;
    ///
    /// let pair = HistoryPair::from_words(vec![1], vec![6]);
    /// assert_eq!(pair.read.access_count(), 1);
    /// assert_eq!(pair.write.access_count(), 2);
    /// ```
    pub fn from_words(read: Vec<u64>, write: Vec<u64>) -> Self {
        Self::new(AccessHistory::new(read), AccessHistory::new(write))
    }

    /// Builds a pair from `int64` wire words.
    pub fn from_signed_words(read: &[i64], write: &[i64]) -> Self {
        Self::new(
            AccessHistory::from_signed_words(read),
            AccessHistory::from_signed_words(write),
        )
    }

    /// Checks that both streams track the same window.
    ///
    /// Not required by extraction. `index` is the pair's position in its
    /// batch and is reported in the error.
    pub fn check_same_window(&self, index: usize) -> Result<(), HistoryError> {
        if self.read.window_bits() != self.write.window_bits() {
            return Err(HistoryError::StreamWindowMismatch {
                index,
                read_bits: self.read.window_bits(),
                write_bits: self.write.window_bits(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> AccessHistory {
        AccessHistory::new(vec![1, 2, 4])
    }

    #[test]
    fn windowed_count_reference_vector() {
        let h = reference();
        assert_eq!(h.windowed_count(1), 1);
        assert_eq!(h.windowed_count(64), 1);
        assert_eq!(h.windowed_count(65), 1);
        assert_eq!(h.windowed_count(66), 2);
        assert_eq!(h.windowed_count(67), 2);
        assert_eq!(h.windowed_count(192), 3);
        assert_eq!(h.windowed_count(193), 3);
    }

    #[test]
    fn windowed_count_zero_window_is_zero() {
        assert_eq!(reference().windowed_count(0), 0);
        assert_eq!(AccessHistory::new(vec![u64::MAX]).windowed_count(0), 0);
    }

    #[test]
    fn gaps_reference_vector() {
        let h = reference();
        assert_eq!(h.gaps(1).values(), &[1]);
        assert_eq!(h.gaps(2).values(), &[1, 65]);
        assert_eq!(h.gaps(3).values(), &[1, 65, 65]);
    }

    #[test]
    fn gaps_zero_fill_is_marked_invalid() {
        let gaps = reference().gaps(6);
        assert_eq!(gaps.values(), &[1, 65, 65, 0, 0, 0]);
        assert_eq!(gaps.filled(), 3);
        assert_eq!(gaps.valid_values(), &[1, 65, 65]);
        assert_eq!(
            gaps.validity(),
            vec![true, true, true, false, false, false]
        );
    }

    #[test]
    fn gaps_on_idle_history() {
        let gaps = AccessHistory::empty(200).gaps(6);
        assert_eq!(gaps.values(), &[0; 6]);
        assert_eq!(gaps.filled(), 0);
        assert!(!gaps.is_valid(0));
    }

    #[test]
    fn gaps_zero_requested_is_empty() {
        let gaps = reference().gaps(0);
        assert!(gaps.is_empty());
        assert_eq!(gaps.filled(), 0);
    }

    #[test]
    fn gaps_within_one_word() {
        // steps 2, 3 and 7
        let h = AccessHistory::new(vec![0b1000_1100]);
        assert_eq!(h.gaps(3).values(), &[3, 1, 4]);
    }

    #[test]
    fn gaps_stop_at_requested_count() {
        let h = AccessHistory::new(vec![u64::MAX, u64::MAX]);
        let gaps = h.gaps(6);
        assert_eq!(gaps.values(), &[1, 1, 1, 1, 1, 1]);
        assert_eq!(gaps.filled(), 6);
    }

    #[test]
    fn gaps_skip_empty_words() {
        let h = AccessHistory::new(vec![0, 0, 1 << 5]);
        assert_eq!(h.gaps(2).values(), &[134, 0]);
    }

    #[test]
    fn with_window_accepts_exact_fit() {
        let h = AccessHistory::with_window(vec![u64::MAX, low_bits(36)], 100).unwrap();
        assert_eq!(h.window_bits(), 100);
        assert_eq!(h.windowed_count(200), 100);
    }

    fn low_bits(n: usize) -> u64 {
        crate::bits::low_mask(n)
    }

    #[test]
    fn with_window_rejects_wrong_word_count() {
        let err = AccessHistory::with_window(vec![0, 0, 0], 100).unwrap_err();
        assert_eq!(
            err,
            HistoryError::WordCountMismatch {
                window_bits: 100,
                expected_words: 2,
                actual_words: 3,
            }
        );
    }

    #[test]
    fn with_window_rejects_stray_bits() {
        let err = AccessHistory::with_window(vec![1 << 30], 30).unwrap_err();
        assert_eq!(err, HistoryError::BitsBeyondWindow { window_bits: 30 });
    }

    #[test]
    fn with_window_zero_needs_no_words() {
        let h = AccessHistory::with_window(Vec::new(), 0).unwrap();
        assert_eq!(h.word_count(), 0);
        assert!(h.is_idle());
    }

    #[test]
    fn signed_words_keep_bit_patterns() {
        let h = AccessHistory::from_signed_words(&[i64::MIN, 3]);
        assert_eq!(h.words(), &[1 << 63, 3]);
        assert!(h.accessed_at(63));
        assert!(h.accessed_at(64));
        assert!(h.accessed_at(65));
        assert!(!h.accessed_at(66));
    }

    #[test]
    fn accessed_at_beyond_storage_is_false() {
        assert!(!reference().accessed_at(10_000));
    }

    #[test]
    fn most_recent_access_finds_lowest_step() {
        assert_eq!(reference().most_recent_access(), Some(0));
        assert_eq!(AccessHistory::new(vec![0, 8]).most_recent_access(), Some(67));
        assert_eq!(AccessHistory::empty(64).most_recent_access(), None);
    }

    #[test]
    fn pair_check_same_window_reports_mismatch() {
        let pair = HistoryPair::from_words(vec![1], vec![1, 0]);
        assert_eq!(
            pair.check_same_window(7),
            Err(HistoryError::StreamWindowMismatch {
                index: 7,
                read_bits: 64,
                write_bits: 128,
            })
        );
        assert!(HistoryPair::from_words(vec![1], vec![6]).check_same_window(0).is_ok());
    }

    #[test]
    fn validate_accepts_every_public_constructor() {
        assert!(reference().validate().is_ok());
        assert!(AccessHistory::empty(100).validate().is_ok());
        assert!(AccessHistory::new(Vec::new()).validate().is_ok());
        assert!(AccessHistory::from_signed_words(&[-1, 3]).validate().is_ok());
    }

    #[test]
    fn validate_catches_broken_trusted_history() {
        let stray = AccessHistory::from_trusted(vec![1 << 20], 10);
        assert_eq!(stray.validate(), Err(HistoryError::BitsBeyondWindow { window_bits: 10 }));
    }
}
