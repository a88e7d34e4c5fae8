//! staleness: access-history feature extraction for cache obsolescence prediction.
//!
//! Cache keys carry packed read and write histories (one bit per time step,
//! bit 0 of word 0 being the most recent step). This crate turns batches of
//! those histories into fixed-width numeric features (windowed access counts,
//! inter-access gaps, and gap differences) for a downstream model that decides
//! whether a key is safe to evict.
//!
//! ## Layout
//!
//! - [`bits`]: word-level popcount and lowest-set-bit primitives.
//! - [`ds`]: histories, trackers producing them, and a per-key registry.
//! - [`features`]: batch extraction into a [`FeatureTable`](features::FeatureTable).
//! - [`predict`]: the [`ObsolescencePredictor`](predict::ObsolescencePredictor) seam.
//! - `service` (feature `concurrency`): worker-pool service with a lifecycle.
//! - `metrics` (feature `metrics`): extraction counters and export.

pub mod bits;
pub mod ds;
pub mod error;
pub mod features;
pub mod predict;

#[cfg(feature = "concurrency")]
pub mod service;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
