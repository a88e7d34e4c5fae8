//! Word-level bit primitives for packed access histories.
//!
//! All histories are sequences of 64-bit words where bit 0 of word 0 is the
//! most recent time step. The helpers here never look at individual bit
//! positions one at a time: window counts are popcounts over whole words plus
//! one masked boundary word, and set-bit scans use the lowest-set-bit trick.
//!
//! ## Operations
//!
//! | Operation                  | Description                             | Complexity  |
//! |----------------------------|-----------------------------------------|-------------|
//! | [`trailing_zero_count`]    | Index of lowest set bit (`None` for 0)  | O(1)        |
//! | [`isolate_lowest_set_bit`] | `w & w.wrapping_neg()`                  | O(1)        |
//! | [`clear_lowest_set_bit`]   | `w & (w - 1)`                           | O(1)        |
//! | [`low_mask`]               | Mask of the low `n` bits                | O(1)        |
//! | [`windowed_count`]         | Set bits among positions `0..k`         | O(⌈k/64⌉)   |
//! | [`set_bit_positions`]      | Iterate global set-bit positions        | O(set bits) |
//!
//! ## Example Usage
//!
//! ```
//! use staleness::bits::{set_bit_positions, trailing_zero_count, windowed_count};
//!
//! let words = [1u64, 2, 4];
//! assert_eq!(windowed_count(&words, 66), 2);
//! assert_eq!(trailing_zero_count(16), Some(4));
//!
//! let positions: Vec<u64> = set_bit_positions(&words).collect();
//! assert_eq!(positions, vec![0, 65, 130]);
//! ```

/// Number of time steps held by one history word.
pub const WORD_BITS: usize = u64::BITS as usize;

/// Returns the number of words needed to hold `bits` time steps.
#[inline]
pub const fn words_for_bits(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

/// Returns the index of the lowest set bit, or `None` for a zero word.
///
/// # Example
///
/// ```
/// use staleness::bits::trailing_zero_count;
///
/// assert_eq!(trailing_zero_count(1), Some(0));
/// assert_eq!(trailing_zero_count(16), Some(4));
/// assert_eq!(trailing_zero_count(0), None);
/// ```
#[inline]
pub fn trailing_zero_count(word: u64) -> Option<u32> {
    if word == 0 {
        None
    } else {
        Some(word.trailing_zeros())
    }
}

/// Returns a word with only the lowest set bit of `word` kept.
#[inline]
pub fn isolate_lowest_set_bit(word: u64) -> u64 {
    word & word.wrapping_neg()
}

/// Returns `word` with its lowest set bit cleared. Zero stays zero.
#[inline]
pub fn clear_lowest_set_bit(word: u64) -> u64 {
    word & word.wrapping_sub(1)
}

/// Returns a mask of the low `n` bits. `n >= 64` yields all ones.
///
/// # Example
///
/// ```
/// use staleness::bits::low_mask;
///
/// assert_eq!(low_mask(0), 0);
/// assert_eq!(low_mask(3), 0b111);
/// assert_eq!(low_mask(64), u64::MAX);
/// ```
#[inline]
pub fn low_mask(n: usize) -> u64 {
    if n >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Counts set bits among the `k` most recent positions (`0..k`).
///
/// Whole words covered by the window are popcounted directly; the word at
/// index `k / 64` is masked to its low `k % 64` bits. Words past the end of
/// `words` count as zero.
pub fn windowed_count(words: &[u64], k: usize) -> u32 {
    let full = k / WORD_BITS;
    let rem = k % WORD_BITS;

    let mut count: u32 = words
        .iter()
        .take(full)
        .map(|word| word.count_ones())
        .sum();

    if rem != 0 {
        if let Some(&word) = words.get(full) {
            count += (word & low_mask(rem)).count_ones();
        }
    }
    count
}

/// Returns an iterator over the global positions of set bits, most recent first.
///
/// Position of a bit is `word_index * 64 + bit_index`.
pub fn set_bit_positions(words: &[u64]) -> SetBitPositions<'_> {
    SetBitPositions {
        words,
        word_idx: 0,
        current: words.first().copied().unwrap_or(0),
    }
}

/// Iterator over set-bit positions of a packed history.
///
/// Created by [`set_bit_positions`].
#[derive(Debug, Clone)]
pub struct SetBitPositions<'a> {
    words: &'a [u64],
    word_idx: usize,
    current: u64, // working copy of words[word_idx] with consumed bits cleared
}

impl Iterator for SetBitPositions<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tz) = trailing_zero_count(self.current) {
                self.current = clear_lowest_set_bit(self.current);
                return Some((self.word_idx * WORD_BITS) as u64 + u64::from(tz));
            }
            self.word_idx += 1;
            self.current = *self.words.get(self.word_idx)?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest: usize = self
            .words
            .get(self.word_idx + 1..)
            .map(|tail| tail.iter().map(|w| w.count_ones() as usize).sum())
            .unwrap_or(0);
        let exact = self.current.count_ones() as usize + rest;
        (exact, Some(exact))
    }
}

impl ExactSizeIterator for SetBitPositions<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zero_count_matches_known_values() {
        assert_eq!(trailing_zero_count(16), Some(4));
        assert_eq!(trailing_zero_count(1), Some(0));
        assert_eq!(trailing_zero_count(1 << 63), Some(63));
        assert_eq!(trailing_zero_count(0), None);
    }

    #[test]
    fn isolate_and_clear_lowest_bit() {
        assert_eq!(isolate_lowest_set_bit(0b1011_0100), 0b100);
        assert_eq!(clear_lowest_set_bit(0b1011_0100), 0b1011_0000);
        assert_eq!(isolate_lowest_set_bit(0), 0);
        assert_eq!(clear_lowest_set_bit(0), 0);
        assert_eq!(isolate_lowest_set_bit(1 << 63), 1 << 63);
    }

    #[test]
    fn isolated_bit_index_equals_trailing_zeros() {
        let word = 0b1010_0000u64;
        let isolated = isolate_lowest_set_bit(word);
        assert_eq!(trailing_zero_count(isolated), trailing_zero_count(word));
    }

    #[test]
    fn words_for_bits_rounds_up() {
        assert_eq!(words_for_bits(0), 0);
        assert_eq!(words_for_bits(1), 1);
        assert_eq!(words_for_bits(64), 1);
        assert_eq!(words_for_bits(65), 2);
        assert_eq!(words_for_bits(200), 4);
    }

    #[test]
    fn windowed_count_reference_vector() {
        let words = [1u64, 2, 4];
        assert_eq!(windowed_count(&words, 0), 0);
        assert_eq!(windowed_count(&words, 1), 1);
        assert_eq!(windowed_count(&words, 64), 1);
        assert_eq!(windowed_count(&words, 65), 1);
        assert_eq!(windowed_count(&words, 66), 2);
        assert_eq!(windowed_count(&words, 67), 2);
        assert_eq!(windowed_count(&words, 192), 3);
        assert_eq!(windowed_count(&words, 193), 3);
    }

    #[test]
    fn windowed_count_partial_mask_is_exact_at_boundary() {
        // bit 29 set: inside a 30-step window, outside a 29-step one
        let words = [1u64 << 29];
        assert_eq!(windowed_count(&words, 29), 0);
        assert_eq!(windowed_count(&words, 30), 1);
    }

    #[test]
    fn windowed_count_on_empty_history() {
        assert_eq!(windowed_count(&[], 0), 0);
        assert_eq!(windowed_count(&[], 200), 0);
    }

    #[test]
    fn set_bit_positions_crosses_words() {
        let words = [0b101u64, 0, 1 << 63];
        let positions: Vec<u64> = set_bit_positions(&words).collect();
        assert_eq!(positions, vec![0, 2, 191]);
    }

    #[test]
    fn set_bit_positions_exact_size() {
        let words = [u64::MAX, 0, 0b11];
        let mut it = set_bit_positions(&words);
        assert_eq!(it.len(), 66);
        it.next();
        assert_eq!(it.len(), 65);
        assert_eq!(it.count(), 65);
    }

    #[test]
    fn set_bit_positions_on_empty_and_zero_words() {
        assert_eq!(set_bit_positions(&[]).count(), 0);
        assert_eq!(set_bit_positions(&[0, 0, 0]).count(), 0);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn naive_count(words: &[u64], k: usize) -> u32 {
        (0..k)
            .filter(|&pos| {
                words
                    .get(pos / WORD_BITS)
                    .is_some_and(|w| (w >> (pos % WORD_BITS)) & 1 == 1)
            })
            .count() as u32
    }

    proptest! {
        /// Property: word-level count agrees with a per-bit scan
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_windowed_count_matches_bit_scan(
            words in prop::collection::vec(any::<u64>(), 0..6),
            k in 0usize..450
        ) {
            prop_assert_eq!(windowed_count(&words, k), naive_count(&words, k));
        }

        /// Property: count never exceeds the window or the total popcount
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_windowed_count_bounded(
            words in prop::collection::vec(any::<u64>(), 0..6),
            k in 0usize..450
        ) {
            let total: u32 = words.iter().map(|w| w.count_ones()).sum();
            let count = windowed_count(&words, k);
            prop_assert!(count as usize <= k);
            prop_assert!(count <= total);
        }

        /// Property: positions are strictly increasing and all refer to set bits
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_set_bit_positions_are_sorted_set_bits(
            words in prop::collection::vec(any::<u64>(), 0..6)
        ) {
            let positions: Vec<u64> = set_bit_positions(&words).collect();
            let total: u32 = words.iter().map(|w| w.count_ones()).sum();
            prop_assert_eq!(positions.len(), total as usize);
            for pair in positions.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for &pos in &positions {
                let word = words[pos as usize / WORD_BITS];
                prop_assert_eq!((word >> (pos as usize % WORD_BITS)) & 1, 1);
            }
        }
    }
}
