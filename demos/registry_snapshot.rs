//! Tracks simulated traffic in an AccessRegistry and extracts a batch.
//!
//! Run with: `cargo run --example registry_snapshot`

use staleness::ds::AccessRegistry;
use staleness::features::{FeatureTable, extract_features};

const WINDOW_BITS: usize = 200;

fn main() {
    let mut registry: AccessRegistry<String> = AccessRegistry::new(WINDOW_BITS);

    // "session" is read every step, "config" every 25 steps, "report" once
    for step in 0..150u64 {
        registry.record_read("session".to_string(), step);
        if step % 25 == 0 {
            registry.record_read("config".to_string(), step);
        }
        if step % 40 == 0 {
            registry.record_write("session".to_string(), step);
        }
    }
    registry.record_write("report".to_string(), 3);
    registry.advance_to(180);

    let keys: Vec<String> = ["session", "config", "report", "never-seen"]
        .iter()
        .map(|k| k.to_string())
        .collect();
    let table = match extract_features(&registry.snapshot(&keys)) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("extraction failed: {err}");
            std::process::exit(1);
        },
    };

    let p200 = FeatureTable::column_index("read_arrive_times_p200").unwrap_or(3);
    for (key, row) in keys.iter().zip(table.rows().iter()) {
        println!("{key:<12} reads in last 200 steps: {}", row[p200]);
    }
    for (key, record) in keys.iter().zip(table.iter()) {
        println!("{key:<12} read gaps: {:?}", &record.read.gaps[..record.read.gap_filled()]);
    }
    println!("tracked keys: {}, clock: {}", registry.len(), registry.now());
}
