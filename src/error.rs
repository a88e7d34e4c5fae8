//! Error types for the staleness library.
//!
//! ## Key Components
//!
//! - [`HistoryError`]: Returned when an access history (or a pair of them) is
//!   structurally invalid. Fails fast; never retried inside the crate.
//! - [`ConfigError`]: Returned when configuration parameters are invalid
//!   (e.g. zero workers, zero queue capacity).
//! - [`ServiceError`]: Returned by the extraction service lifecycle and
//!   request path (feature `concurrency`).
//!
//! ## Example Usage
//!
//! ```
//! use staleness::ds::AccessHistory;
//! use staleness::error::HistoryError;
//!
//! // 100 tracked steps need exactly two words
//! assert!(AccessHistory::with_window(vec![0, 0], 100).is_ok());
//!
//! // A bit at step 120 lies outside a 100-step window
//! let err = AccessHistory::with_window(vec![0, 1 << 56], 100).unwrap_err();
//! assert_eq!(err, HistoryError::BitsBeyondWindow { window_bits: 100 });
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// HistoryError
// ---------------------------------------------------------------------------

/// Error returned when access-history input is malformed.
///
/// Produced by [`AccessHistory::with_window`](crate::ds::AccessHistory::with_window),
/// by [`extract_features`](crate::features::extract_features) when a history
/// breaks its own window invariant, and by the opt-in
/// [`HistoryPair::check_same_window`](crate::ds::HistoryPair::check_same_window).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The stored word count does not cover the declared window exactly.
    WordCountMismatch {
        window_bits: usize,
        expected_words: usize,
        actual_words: usize,
    },
    /// A bit is set at a position the declared window does not track.
    BitsBeyondWindow { window_bits: usize },
    /// The read and write streams of batch entry `index` track different
    /// windows. Only reported by the opt-in same-window check.
    StreamWindowMismatch {
        index: usize,
        read_bits: usize,
        write_bits: usize,
    },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::WordCountMismatch {
                window_bits,
                expected_words,
                actual_words,
            } => write!(
                f,
                "malformed history: window of {window_bits} steps needs {expected_words} words, got {actual_words}"
            ),
            HistoryError::BitsBeyondWindow { window_bits } => write!(
                f,
                "malformed history: access recorded beyond window of {window_bits} steps"
            ),
            HistoryError::StreamWindowMismatch {
                index,
                read_bits,
                write_bits,
            } => write!(
                f,
                "streams at batch index {index} track different windows: read {read_bits}, write {write_bits}"
            ),
        }
    }
}

impl std::error::Error for HistoryError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when configuration parameters are invalid.
///
/// Produced by fallible builders such as
/// [`ServiceConfigBuilder::try_build`](crate::service::ServiceConfigBuilder::try_build).
/// Carries a human-readable description of which parameter failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Error returned by the extraction service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// `start` was called on a running service.
    AlreadyRunning,
    /// A request arrived while the service was stopped.
    NotRunning,
    /// The bounded job queue is full.
    QueueFull,
    /// The worker handling the request exited before replying.
    WorkerGone,
    /// The predictor panicked while handling the request. The worker keeps
    /// serving later requests.
    PredictorPanicked,
    /// A worker thread could not be spawned.
    Spawn(String),
    /// The batch was rejected by the extractor.
    Extraction(HistoryError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::AlreadyRunning => f.write_str("service is already running"),
            ServiceError::NotRunning => f.write_str("service is not running"),
            ServiceError::QueueFull => f.write_str("service job queue is full"),
            ServiceError::WorkerGone => f.write_str("worker exited before replying"),
            ServiceError::PredictorPanicked => f.write_str("predictor panicked on this batch"),
            ServiceError::Spawn(msg) => write!(f, "failed to spawn worker: {msg}"),
            ServiceError::Extraction(err) => write!(f, "extraction failed: {err}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Extraction(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HistoryError> for ServiceError {
    fn from(err: HistoryError) -> Self {
        ServiceError::Extraction(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- HistoryError -----------------------------------------------------

    #[test]
    fn history_display_names_window() {
        let err = HistoryError::BitsBeyondWindow { window_bits: 100 };
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn history_word_mismatch_display_shows_counts() {
        let err = HistoryError::WordCountMismatch {
            window_bits: 130,
            expected_words: 3,
            actual_words: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("130"));
        assert!(msg.contains("3 words"));
        assert!(msg.contains("got 2"));
    }

    #[test]
    fn history_stream_mismatch_display_shows_index() {
        let err = HistoryError::StreamWindowMismatch {
            index: 4,
            read_bits: 64,
            write_bits: 128,
        };
        assert!(err.to_string().contains("index 4"));
    }

    #[test]
    fn history_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<HistoryError>();
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("workers must be > 0");
        assert_eq!(err.to_string(), "workers must be > 0");
    }

    #[test]
    fn config_message_accessor() {
        let err = ConfigError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    // -- ServiceError -----------------------------------------------------

    #[test]
    fn service_wraps_history_error_as_source() {
        use std::error::Error;

        let inner = HistoryError::BitsBeyondWindow { window_bits: 10 };
        let err = ServiceError::from(inner.clone());
        assert_eq!(err, ServiceError::Extraction(inner));
        assert!(err.source().is_some());
        assert!(ServiceError::NotRunning.source().is_none());
    }

    #[test]
    fn service_predictor_panic_has_no_source() {
        use std::error::Error;

        let err = ServiceError::PredictorPanicked;
        assert!(err.source().is_none());
        assert!(err.to_string().contains("panicked"));
    }

    #[test]
    fn service_display_is_lowercase_sentence() {
        assert_eq!(
            ServiceError::QueueFull.to_string(),
            "service job queue is full"
        );
    }
}
