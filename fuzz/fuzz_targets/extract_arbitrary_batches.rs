#![no_main]

use libfuzzer_sys::fuzz_target;
use staleness::ds::HistoryPair;
use staleness::features::{FEATURE_WIDTH, FeatureRecord, StreamFeatures, extract_features};

// Fuzz test for batch extraction with arbitrary word data
//
// Each row takes a header byte giving independent read and write word counts,
// followed by the words. Streams of any length are well-formed, so every
// batch must extract, and each block must depend only on its own stream.
fuzz_target!(|data: &[u8]| {
    let mut batch = Vec::new();
    let mut rest = data;

    while let Some((&header, tail)) = rest.split_first() {
        let read_words = (header & 0x07) as usize;
        let write_words = ((header >> 3) & 0x07) as usize;
        let needed = (read_words + write_words) * 8;
        if tail.len() < needed {
            break;
        }
        let (body, tail) = tail.split_at(needed);
        let words: Vec<u64> = body
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        let (read, write) = words.split_at(read_words);
        batch.push(HistoryPair::from_words(read.to_vec(), write.to_vec()));
        rest = tail;
    }

    let table = extract_features(&batch).unwrap();
    assert_eq!(table.shape(), (batch.len(), FEATURE_WIDTH));
    for (pair, record) in batch.iter().zip(table.iter()) {
        assert_eq!(*record, FeatureRecord::from_pair(pair));
        assert_eq!(record.read, StreamFeatures::from_history(&pair.read));
        assert_eq!(record.write, StreamFeatures::from_history(&pair.write));
    }
});
