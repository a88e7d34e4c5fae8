//! Extraction service with an explicit start/stop lifecycle.
//!
//! [`ExtractionService`] owns a pool of worker threads fed through a bounded
//! job queue. Each job is one batch of [`HistoryPair`]s: a worker extracts its
//! [`FeatureTable`](crate::features::FeatureTable), hands it to the configured
//! [`ObsolescencePredictor`], and replies with the verdicts.
//!
//! ## Architecture
//!
//! ```text
//!   caller ── predict(batch) ──► try_send ──► ┌─────────────────────┐
//!      ▲                                      │ bounded job queue   │
//!      │                                      │ (queue_capacity)    │
//!      │                                      └──────────┬──────────┘
//!      │                                                 │ recv
//!      │                      ┌──────────────┬───────────┴──┬──────────────┐
//!      │                      ▼              ▼              ▼              ▼
//!      │                  worker 0       worker 1        ...         worker N-1
//!      │                      │ extract ─► predict
//!      └──── reply (bounded(1) per job) ◄──┘
//! ```
//!
//! ## Lifecycle
//!
//! | Method        | Stopped                | Running                           |
//! |---------------|------------------------|-----------------------------------|
//! | `start()`     | spawns workers         | `Err(AlreadyRunning)`             |
//! | `predict()`   | `Err(NotRunning)`      | queues job, waits for the reply   |
//! | `stop()`      | `Err(NotRunning)`      | closes queue, drains, joins       |
//! | drop          | nothing                | same as `stop()`                  |
//!
//! Jobs already queued when `stop()` is called are still processed before the
//! workers exit. A full queue rejects the job immediately with
//! [`ServiceError::QueueFull`] instead of blocking the caller.
//!
//! ## Example Usage
//!
//! ```
//! use staleness::ds::HistoryPair;
//! use staleness::predict::NoopPredictor;
//! use staleness::service::{ExtractionService, ServiceConfig};
//!
//! let config = ServiceConfig::builder().workers(2).try_build().unwrap();
//! let service = ExtractionService::new(config, NoopPredictor);
//! service.start().unwrap();
//!
//! let verdicts = service
//!     .predict(vec![HistoryPair::from_words(vec![1], vec![6])])
//!     .unwrap();
//! assert!(verdicts.is_empty());
//!
//! service.stop().unwrap();
//! assert!(!service.is_running());
//! ```

use std::fmt;
use std::net::{Ipv6Addr, SocketAddr};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{info, trace, warn};
use parking_lot::Mutex;

use crate::ds::access_history::HistoryPair;
use crate::error::{ConfigError, ServiceError};
use crate::features::FeatureExtractor;
use crate::predict::ObsolescencePredictor;

/// Default port transport adapters bind.
pub const DEFAULT_PORT: u16 = 50051;

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 10;

/// Default number of batches that may wait in the queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Service configuration.
///
/// `bind_addr` is carried for transport adapters; the service itself never
/// opens a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv6Addr::UNSPECIFIED, DEFAULT_PORT)),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ServiceConfig {
    /// Returns a builder seeded with the defaults.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::new()
    }

    /// Checks that the pool and queue are non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `workers` or `queue_capacity` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::new("workers must be greater than zero"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::new("queue_capacity must be greater than zero"));
        }
        Ok(())
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address transport adapters bind.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Sets the number of worker threads.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Sets how many batches may wait for a worker.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Builds the configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. For a non-panicking
    /// alternative, use [`try_build`](Self::try_build).
    pub fn build(self) -> ServiceConfig {
        match self.try_build() {
            Ok(config) => config,
            Err(e) => panic!("{}", e),
        }
    }

    /// Builds the configuration, returning an error on invalid parameters
    /// instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `workers` or `queue_capacity` is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use staleness::service::ServiceConfig;
    ///
    /// assert!(ServiceConfig::builder().workers(0).try_build().is_err());
    /// assert!(ServiceConfig::builder().queue_capacity(8).try_build().is_ok());
    /// ```
    pub fn try_build(self) -> Result<ServiceConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

struct Job {
    batch: Vec<HistoryPair>,
    reply: Sender<Result<Vec<bool>, ServiceError>>,
}

struct Shared<P> {
    extractor: FeatureExtractor,
    predictor: P,
}

struct Running {
    jobs: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

/// Worker-pool service turning history batches into obsolescence verdicts.
///
/// All methods take `&self`; the service can be shared across threads behind
/// an `Arc`.
pub struct ExtractionService<P> {
    config: ServiceConfig,
    shared: Arc<Shared<P>>,
    state: Mutex<Option<Running>>,
}

impl<P> ExtractionService<P>
where
    P: ObsolescencePredictor + 'static,
{
    /// Creates a stopped service.
    pub fn new(config: ServiceConfig, predictor: P) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                extractor: FeatureExtractor::new(),
                predictor,
            }),
            state: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Spawns the worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::AlreadyRunning`] if the service is running, or
    /// [`ServiceError::Spawn`] if a worker thread cannot be created. In the
    /// latter case any workers already spawned are shut down again.
    pub fn start(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        if state.is_some() {
            return Err(ServiceError::AlreadyRunning);
        }

        let (jobs, queue) = bounded::<Job>(self.config.queue_capacity);
        let mut workers = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let queue = queue.clone();
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("staleness-worker-{id}"))
                .spawn(move || worker_loop(id, &queue, &shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    drop(jobs);
                    join_all(workers);
                    return Err(ServiceError::Spawn(err.to_string()));
                },
            }
        }

        info!(
            "extraction service started: {} workers, queue capacity {}, adapter address {}",
            self.config.workers, self.config.queue_capacity, self.config.bind_addr
        );
        *state = Some(Running { jobs, workers });
        Ok(())
    }

    /// Closes the queue and waits for every worker to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotRunning`] if the service is stopped.
    pub fn stop(&self) -> Result<(), ServiceError> {
        let running = self.state.lock().take().ok_or(ServiceError::NotRunning)?;
        let Running { jobs, workers } = running;
        drop(jobs);
        join_all(workers);
        info!("extraction service stopped");
        Ok(())
    }

    /// Extracts features from `batch` on a worker and returns the
    /// predictor's verdicts.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotRunning`] if the service is stopped.
    /// - [`ServiceError::QueueFull`] if no queue slot is free.
    /// - [`ServiceError::Extraction`] if the batch is malformed.
    /// - [`ServiceError::PredictorPanicked`] if the predictor panicked on
    ///   this batch. The worker survives and keeps serving.
    /// - [`ServiceError::WorkerGone`] if the worker died before replying.
    pub fn predict(&self, batch: Vec<HistoryPair>) -> Result<Vec<bool>, ServiceError> {
        let jobs = self
            .state
            .lock()
            .as_ref()
            .map(|running| running.jobs.clone())
            .ok_or(ServiceError::NotRunning)?;

        let (reply, response) = bounded(1);
        jobs.try_send(Job { batch, reply }).map_err(|err| match err {
            TrySendError::Full(_) => ServiceError::QueueFull,
            TrySendError::Disconnected(_) => ServiceError::NotRunning,
        })?;
        drop(jobs);

        response.recv().map_err(|_| ServiceError::WorkerGone)?
    }
}

impl<P> Drop for ExtractionService<P> {
    fn drop(&mut self) {
        if let Some(Running { jobs, workers }) = self.state.get_mut().take() {
            drop(jobs);
            join_all(workers);
            info!("extraction service stopped on drop");
        }
    }
}

impl<P> fmt::Debug for ExtractionService<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionService")
            .field("config", &self.config)
            .field("running", &self.state.lock().is_some())
            .finish()
    }
}

fn worker_loop<P: ObsolescencePredictor>(id: usize, queue: &Receiver<Job>, shared: &Shared<P>) {
    for Job { batch, reply } in queue.iter() {
        trace!("worker {} handling batch of {} histories", id, batch.len());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            shared
                .extractor
                .extract(&batch)
                .map(|table| shared.predictor.predict(&table))
        }));
        let result = match outcome {
            Ok(verdicts) => verdicts.map_err(ServiceError::from),
            Err(_) => {
                warn!("worker {} recovered from predictor panic", id);
                Err(ServiceError::PredictorPanicked)
            },
        };
        // caller may have given up on the reply
        let _ = reply.send(result);
    }
    trace!("worker {} exiting", id);
}

fn join_all(workers: Vec<JoinHandle<()>>) {
    for handle in workers {
        if handle.join().is_err() {
            warn!("extraction worker panicked");
        }
    }
}
