pub use crate::ds::{
    AccessHistory, AccessRegistry, AccessTracker, FixedAccessTracker, GapSequence, HistoryPair,
    WindowedAccessTracker,
};
pub use crate::error::{ConfigError, HistoryError};
pub use crate::features::{
    FEATURE_COLUMNS, FEATURE_WIDTH, FeatureExtractor, FeatureRecord, FeatureTable, Stream,
    StreamFeatures, extract_features,
};
pub use crate::predict::{NoopPredictor, ObsolescencePredictor};

#[cfg(feature = "concurrency")]
pub use crate::error::ServiceError;
#[cfg(feature = "concurrency")]
pub use crate::service::{ExtractionService, ServiceConfig, ServiceConfigBuilder};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::ExtractionMetricsSnapshot;
