#![no_main]

use libfuzzer_sys::fuzz_target;
use staleness::bits::set_bit_positions;
use staleness::ds::AccessHistory;

// Fuzz property-based tests for AccessHistory
//
// Tests specific invariants and properties:
// - Window counts are monotone in k and bounded by k
// - Gaps reconstruct the set-bit positions
// - Unfilled gap slots are zero and invalid
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let k = data[0] as usize;
    let test_type = data[1] % 3;
    let words: Vec<u64> = data[2..]
        .chunks(8)
        .take(8)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            u64::from_le_bytes(buf)
        })
        .collect();
    let history = AccessHistory::new(words);

    match test_type {
        0 => test_window_counts(&history, k),
        1 => test_gap_reconstruction(&history, k),
        2 => test_gap_fill(&history, k),
        _ => unreachable!(),
    }
});

fn test_window_counts(history: &AccessHistory, k: usize) {
    let mut prev = 0;
    for window in 0..=k {
        let count = history.windowed_count(window);
        assert!(count >= prev);
        assert!(count as usize <= window);
        prev = count;
    }
    assert!(history.windowed_count(k) <= history.access_count());
}

fn test_gap_reconstruction(history: &AccessHistory, k: usize) {
    let gaps = history.gaps(k);
    let mut pos = -1i64;
    let rebuilt: Vec<u64> = gaps
        .valid_values()
        .iter()
        .map(|&gap| {
            pos += gap as i64;
            pos as u64
        })
        .collect();
    let expected: Vec<u64> = set_bit_positions(history.words()).take(k).collect();
    assert_eq!(rebuilt, expected);
}

fn test_gap_fill(history: &AccessHistory, k: usize) {
    let gaps = history.gaps(k);
    assert_eq!(gaps.len(), k);
    assert_eq!(gaps.filled(), (history.access_count() as usize).min(k));
    for (i, &gap) in gaps.values().iter().enumerate() {
        if gaps.is_valid(i) {
            assert!(gap >= 1);
        } else {
            assert_eq!(gap, 0);
        }
    }
}
