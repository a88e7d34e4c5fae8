pub mod access_history;
pub mod access_tracker;
pub mod registry;

pub use access_history::{AccessHistory, GapSequence, HistoryPair};
pub use access_tracker::{AccessTracker, FixedAccessTracker, WindowedAccessTracker};
pub use registry::AccessRegistry;
