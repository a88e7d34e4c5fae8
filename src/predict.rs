//! Obsolescence prediction over extracted features.
//!
//! A predictor maps each row of a [`FeatureTable`] to a verdict: `true` means
//! the key is expected to see no further accesses. Models live outside this
//! crate; [`NoopPredictor`] is the placeholder used until one is plugged in.
//!
//! ## Example Usage
//!
//! ```
//! use staleness::features::{FeatureTable, Stream};
//! use staleness::predict::ObsolescencePredictor;
//!
//! /// Flags keys with no reads in the last 200 steps.
//! struct ColdReads;
//!
//! impl ObsolescencePredictor for ColdReads {
//!     fn predict(&self, table: &FeatureTable) -> Vec<bool> {
//!         table
//!             .iter()
//!             .map(|r| r.stream(Stream::Read).window_counts[3] == 0)
//!             .collect()
//!     }
//! }
//! ```

use crate::features::FeatureTable;

/// Maps feature rows to obsolescence verdicts.
///
/// Implementations should return one verdict per row, in row order. They are
/// shared across worker threads, hence `Send + Sync`.
pub trait ObsolescencePredictor: Send + Sync {
    fn predict(&self, table: &FeatureTable) -> Vec<bool>;
}

impl<P: ObsolescencePredictor + ?Sized> ObsolescencePredictor for std::sync::Arc<P> {
    fn predict(&self, table: &FeatureTable) -> Vec<bool> {
        (**self).predict(table)
    }
}

impl<P: ObsolescencePredictor + ?Sized> ObsolescencePredictor for Box<P> {
    fn predict(&self, table: &FeatureTable) -> Vec<bool> {
        (**self).predict(table)
    }
}

/// Predictor with no model. Always returns an empty verdict list.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPredictor;

impl ObsolescencePredictor for NoopPredictor {
    fn predict(&self, _table: &FeatureTable) -> Vec<bool> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::HistoryPair;
    use crate::features::extract_features;
    use std::sync::Arc;

    struct WriteHeavy;

    impl ObsolescencePredictor for WriteHeavy {
        fn predict(&self, table: &FeatureTable) -> Vec<bool> {
            table
                .iter()
                .map(|r| r.write.window_counts[0] > r.read.window_counts[0])
                .collect()
        }
    }

    fn table() -> FeatureTable {
        extract_features(&[
            HistoryPair::from_words(vec![0b111], vec![0b1]),
            HistoryPair::from_words(vec![0], vec![0b11]),
        ])
        .unwrap()
    }

    #[test]
    fn noop_returns_empty() {
        assert!(NoopPredictor.predict(&table()).is_empty());
        assert!(NoopPredictor.predict(&FeatureTable::new()).is_empty());
    }

    #[test]
    fn custom_predictor_sees_rows_in_order() {
        assert_eq!(WriteHeavy.predict(&table()), vec![false, true]);
    }

    #[test]
    fn shared_and_boxed_predictors_delegate() {
        let shared = Arc::new(WriteHeavy);
        assert_eq!(shared.predict(&table()), vec![false, true]);

        let boxed: Box<dyn ObsolescencePredictor> = Box::new(WriteHeavy);
        assert_eq!(boxed.predict(&table()), vec![false, true]);
    }
}
