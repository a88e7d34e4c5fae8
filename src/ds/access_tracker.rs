//! Access trackers that produce packed histories as time advances.
//!
//! A tracker owns the mutable side of an [`AccessHistory`]: every time the
//! global step advances by `d`, both streams shift left by `d` bits (older
//! accesses move to higher positions), and a read or write at the current
//! step sets bit 0 of its stream.
//!
//! ## Architecture
//!
//! ```text
//!   step 10: record_read        step 12: record_write        step 12: history_pair()
//!   ──────────────────────      ─────────────────────       ───────────────────────
//!   read : ...0001              read : ...0100  (<< 2)       read : bit 2 set
//!   write: ...0000              write: ...0001  (<< 2 | 1)   write: bit 0 set
//! ```
//!
//! ## Key Components
//!
//! - [`AccessTracker`]: Common interface for all trackers
//! - [`FixedAccessTracker`]: One word per stream (64 steps)
//! - [`WindowedAccessTracker`]: Configurable window, multi-word shifts
//! - [`shift_bits`]: Multi-word left shift used by the windowed tracker
//!
//! ## Example Usage
//!
//! ```
//! use staleness::ds::{AccessTracker, WindowedAccessTracker};
//!
//! let mut tracker = WindowedAccessTracker::new(200);
//! tracker.record_read(10);
//! tracker.record_read(75);
//! tracker.record_write(75);
//!
//! let pair = tracker.history_pair();
//! assert_eq!(pair.read.gaps(2).values(), &[1, 65]);
//! assert_eq!(pair.write.windowed_count(30), 1);
//! ```
//!
//! ## Thread Safety
//!
//! Trackers are plain data and not synchronized. Wrap them in a lock (or keep
//! them inside an [`AccessRegistry`](crate::ds::AccessRegistry) behind one)
//! when shared.

use crate::bits::{self, WORD_BITS};
use crate::ds::access_history::{AccessHistory, HistoryPair};

/// Common interface for trackers that turn timed accesses into histories.
///
/// Steps are monotonically increasing logical clock values. A step earlier
/// than [`last_update_step`](Self::last_update_step) is treated as the current
/// step: nothing shifts and the access lands on bit 0.
pub trait AccessTracker {
    /// Records a read at `step`.
    fn record_read(&mut self, step: u64);

    /// Records a write at `step`.
    fn record_write(&mut self, step: u64);

    /// Advances both streams to `step` without recording an access.
    fn sync_time_step(&mut self, step: u64);

    /// Returns the step both streams were last shifted to.
    fn last_update_step(&self) -> u64;

    /// Returns an immutable snapshot of both streams.
    fn history_pair(&self) -> HistoryPair;
}

// ---------------------------------------------------------------------------
// FixedAccessTracker
// ---------------------------------------------------------------------------

/// Tracker holding one 64-step word per stream.
///
/// # Example
///
/// ```
/// use staleness::ds::{AccessTracker, FixedAccessTracker};
///
/// let mut tracker = FixedAccessTracker::new();
/// tracker.record_write(3);
/// tracker.sync_time_step(5);
///
/// assert_eq!(tracker.write_word(), 1 << 2);
/// assert_eq!(tracker.history_pair().write.most_recent_access(), Some(2));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedAccessTracker {
    reads: u64,
    writes: u64,
    last_update_step: u64,
}

impl FixedAccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the packed read word.
    pub fn read_word(&self) -> u64 {
        self.reads
    }

    /// Returns the packed write word.
    pub fn write_word(&self) -> u64 {
        self.writes
    }
}

impl AccessTracker for FixedAccessTracker {
    fn record_read(&mut self, step: u64) {
        self.sync_time_step(step);
        self.reads |= 1;
    }

    fn record_write(&mut self, step: u64) {
        self.sync_time_step(step);
        self.writes |= 1;
    }

    fn sync_time_step(&mut self, step: u64) {
        let delta = step.saturating_sub(self.last_update_step);
        // shifts of 64+ steps push every recorded access out of the word
        let shift = u32::try_from(delta).unwrap_or(u32::MAX);
        self.reads = self.reads.checked_shl(shift).unwrap_or(0);
        self.writes = self.writes.checked_shl(shift).unwrap_or(0);
        self.last_update_step = self.last_update_step.max(step);
    }

    fn last_update_step(&self) -> u64 {
        self.last_update_step
    }

    fn history_pair(&self) -> HistoryPair {
        HistoryPair::from_words(vec![self.reads], vec![self.writes])
    }
}

// ---------------------------------------------------------------------------
// WindowedAccessTracker
// ---------------------------------------------------------------------------

/// Tracker holding `ceil(window_bits / 64)` words per stream.
///
/// Accesses older than `window_bits` steps are dropped, so snapshots always
/// validate against [`AccessHistory::with_window`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowedAccessTracker {
    reads: Vec<u64>,
    writes: Vec<u64>,
    window_bits: usize,
    last_update_step: u64,
}

impl WindowedAccessTracker {
    /// Creates a tracker remembering the last `window_bits` steps.
    ///
    /// # Example
    ///
    /// ```
    /// use staleness::ds::WindowedAccessTracker;
    ///
    /// let tracker = WindowedAccessTracker::new(200);
    /// assert_eq!(tracker.window_bits(), 200);
    /// assert_eq!(tracker.word_count(), 4);
    /// ```
    pub fn new(window_bits: usize) -> Self {
        let words = bits::words_for_bits(window_bits);
        Self {
            reads: vec![0; words],
            writes: vec![0; words],
            window_bits,
            last_update_step: 0,
        }
    }

    /// Returns the number of steps remembered.
    pub fn window_bits(&self) -> usize {
        self.window_bits
    }

    /// Returns the number of words per stream.
    pub fn word_count(&self) -> usize {
        self.reads.len()
    }

    /// Returns the packed read words.
    pub fn read_words(&self) -> &[u64] {
        &self.reads
    }

    /// Returns the packed write words.
    pub fn write_words(&self) -> &[u64] {
        &self.writes
    }

    /// Clears both streams without moving the clock.
    pub fn clear(&mut self) {
        self.reads.fill(0);
        self.writes.fill(0);
    }

    fn trim(&mut self) {
        let rem = self.window_bits % WORD_BITS;
        if rem == 0 {
            return;
        }
        let mask = bits::low_mask(rem);
        if let Some(last) = self.reads.last_mut() {
            *last &= mask;
        }
        if let Some(last) = self.writes.last_mut() {
            *last &= mask;
        }
    }
}

impl AccessTracker for WindowedAccessTracker {
    fn record_read(&mut self, step: u64) {
        self.sync_time_step(step);
        if let Some(first) = self.reads.first_mut() {
            *first |= 1;
        }
    }

    fn record_write(&mut self, step: u64) {
        self.sync_time_step(step);
        if let Some(first) = self.writes.first_mut() {
            *first |= 1;
        }
    }

    fn sync_time_step(&mut self, step: u64) {
        let delta = step.saturating_sub(self.last_update_step);
        if delta > 0 {
            shift_bits(&mut self.reads, delta);
            shift_bits(&mut self.writes, delta);
            self.trim();
            self.last_update_step = step;
        }
    }

    fn last_update_step(&self) -> u64 {
        self.last_update_step
    }

    fn history_pair(&self) -> HistoryPair {
        // trim() keeps the tail word inside the window
        HistoryPair::new(
            AccessHistory::from_trusted(self.reads.clone(), self.window_bits),
            AccessHistory::from_trusted(self.writes.clone(), self.window_bits),
        )
    }
}

/// Shifts a packed history `shift` steps into the past.
///
/// Bits move from word `i` toward word `i + shift / 64`, carrying across word
/// boundaries; bits pushed past the last word are dropped. A shift of at least
/// `64 * words.len()` clears the vector.
///
/// # Example
///
/// ```
/// use staleness::ds::access_tracker::shift_bits;
///
/// let mut words = vec![1, 0, 0, 0];
/// shift_bits(&mut words, 65);
/// assert_eq!(words, vec![0, 2, 0, 0]);
/// ```
pub fn shift_bits(words: &mut [u64], shift: u64) {
    let len = words.len();
    let word_shift = usize::try_from(shift / WORD_BITS as u64).unwrap_or(usize::MAX);
    if word_shift >= len {
        words.fill(0);
        return;
    }

    let bit_shift = (shift % WORD_BITS as u64) as u32;
    for i in (word_shift..len).rev() {
        let src = i - word_shift;
        let mut val = words[src] << bit_shift;
        if bit_shift > 0 && src > 0 {
            val |= words[src - 1] >> (WORD_BITS as u32 - bit_shift);
        }
        words[i] = val;
    }
    words[..word_shift].fill(0);
}
