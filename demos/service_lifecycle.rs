//! Starts an ExtractionService with a toy predictor and feeds it batches
//! from several threads.
//!
//! Run with: `cargo run --example service_lifecycle`

use std::sync::Arc;
use std::thread;

use staleness::ds::HistoryPair;
use staleness::error::ServiceError;
use staleness::features::FeatureTable;
use staleness::predict::ObsolescencePredictor;
use staleness::service::{ExtractionService, ServiceConfig};

/// Flags keys with no access of either kind in the last 100 steps.
struct IdleFor100;

impl ObsolescencePredictor for IdleFor100 {
    fn predict(&self, table: &FeatureTable) -> Vec<bool> {
        table
            .iter()
            .map(|r| r.read.window_counts[2] == 0 && r.write.window_counts[2] == 0)
            .collect()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::builder()
        .workers(4)
        .queue_capacity(32)
        .try_build()?;
    println!(
        "config: {} workers, queue {}, adapter address {}",
        config.workers, config.queue_capacity, config.bind_addr
    );

    let service = Arc::new(ExtractionService::new(config, IdleFor100));
    service.start()?;

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let service = Arc::clone(&service);
            thread::spawn(move || -> Result<usize, ServiceError> {
                let batch: Vec<HistoryPair> = (0..16u64)
                    .map(|i| {
                        let shift = (t * 16 + i) % 128;
                        let mut read = vec![0u64; 2];
                        read[(shift / 64) as usize] = 1 << (shift % 64);
                        HistoryPair::from_words(read, vec![0, 0])
                    })
                    .collect();
                let verdicts = service.predict(batch)?;
                Ok(verdicts.iter().filter(|&&stale| stale).count())
            })
        })
        .collect();

    for (t, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(stale)) => println!("caller {t}: {stale} of 16 keys look obsolete"),
            Ok(Err(err)) => println!("caller {t}: {err}"),
            Err(_) => println!("caller {t}: panicked"),
        }
    }

    service.stop()?;
    println!("running after stop: {}", service.is_running());
    Ok(())
}
