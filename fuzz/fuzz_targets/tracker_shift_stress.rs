#![no_main]

use libfuzzer_sys::fuzz_target;
use staleness::ds::{AccessHistory, AccessTracker, FixedAccessTracker, WindowedAccessTracker};

// Stress test for tracker time shifts
//
// Replays arbitrary (step delta, stream) events against a fixed tracker and a
// 64-step windowed tracker and checks they agree, and that windowed
// snapshots always validate against their declared window.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let window_bits = (data[0] as usize % 300) + 1;
    let mut fixed = FixedAccessTracker::new();
    let mut narrow = WindowedAccessTracker::new(64);
    let mut wide = WindowedAccessTracker::new(window_bits);
    let mut step = 0u64;

    for pair in data[1..].chunks_exact(2) {
        step += u64::from(pair[0]);
        match pair[1] % 3 {
            0 => {
                fixed.record_read(step);
                narrow.record_read(step);
                wide.record_read(step);
            },
            1 => {
                fixed.record_write(step);
                narrow.record_write(step);
                wide.record_write(step);
            },
            _ => {
                fixed.sync_time_step(step);
                narrow.sync_time_step(step);
                wide.sync_time_step(step);
            },
        }

        let a = fixed.history_pair();
        let b = narrow.history_pair();
        assert_eq!(a.read.words(), b.read.words());
        assert_eq!(a.write.words(), b.write.words());

        let snapshot = wide.history_pair();
        assert!(snapshot.check_same_window(0).is_ok());
        assert!(
            AccessHistory::with_window(snapshot.read.words().to_vec(), window_bits).is_ok()
        );
        assert!(
            AccessHistory::with_window(snapshot.write.words().to_vec(), window_bits).is_ok()
        );
    }
});
