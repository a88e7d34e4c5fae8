//! Extracts features from a small hand-written batch and prints the table.
//!
//! Run with: `cargo run --example basic_extract`

use staleness::ds::HistoryPair;
use staleness::features::{FEATURE_COLUMNS, extract_features};

fn main() {
    let batch = vec![
        HistoryPair::from_words(vec![1, 2, 4, 0], vec![0, 0, 0, 0]),
        HistoryPair::from_words(vec![0xFF, 0, 0, 0], vec![0b1001, 0, 1, 0]),
        HistoryPair::from_signed_words(&[-1, -1, 0, 0], &[0, 0, 0, i64::MIN]),
    ];

    let table = match extract_features(&batch) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("extraction failed: {err}");
            std::process::exit(1);
        },
    };

    let (rows, cols) = table.shape();
    println!("feature table: {rows} rows x {cols} columns\n");

    for (i, row) in table.rows().iter().enumerate() {
        println!("row {i}");
        for (name, value) in FEATURE_COLUMNS.iter().zip(row.iter()) {
            println!("  {name:<26} {value:>6}");
        }
    }

    for (i, record) in table.iter().enumerate() {
        println!(
            "row {i}: {} valid read gaps, {} valid write gaps",
            record.read.gap_filled(),
            record.write.gap_filled()
        );
    }
}
