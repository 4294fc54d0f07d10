//! Fixed-size worker pool over a bounded job queue
//!
//! Workers are tokio tasks pulling boxed [`Job`]s from one shared queue.
//! `submit` waits while the queue is full, which is the only admission
//! control. Results are delivered on a channel in completion order.

use super::job::{Job, JobKind, JobResult};
use crate::config::PoolConfig;
use crate::ScanError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Largest accepted job queue capacity
pub const MAX_QUEUE_CAPACITY: usize = 65_536;

type JobQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<Box<dyn Job>>>>;

/// Per-worker counters, published once when the worker stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub jobs_processed: u64,
    pub errors_encountered: u64,
    pub jobs_by_kind: BTreeMap<JobKind, u64>,
}

impl WorkerStats {
    fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    fn record(&mut self, result: &JobResult) {
        self.jobs_processed += 1;
        *self.jobs_by_kind.entry(result.job_kind).or_insert(0) += 1;
        if !result.is_ok() {
            self.errors_encountered += 1;
        }
    }
}

/// Point-in-time worker occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub total: usize,
    pub busy: usize,
    pub free: usize,
}

/// Busy-worker count, kept apart from everything else so status reads
/// never contend with queue or result traffic
#[derive(Debug)]
struct Occupancy {
    total: usize,
    busy: Mutex<usize>,
}

impl Occupancy {
    fn mark_busy(&self) {
        *self.busy.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn mark_free(&self) {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        *busy = busy.saturating_sub(1);
    }

    fn status(&self) -> PoolStatus {
        let busy = *self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        PoolStatus {
            total: self.total,
            busy,
            free: self.total.saturating_sub(busy),
        }
    }
}

/// Cloneable view of pool occupancy, usable while the pool itself is borrowed
#[derive(Debug, Clone)]
pub struct StatusHandle {
    occupancy: Arc<Occupancy>,
}

impl StatusHandle {
    pub fn status(&self) -> PoolStatus {
        self.occupancy.status()
    }
}

/// Fixed set of workers executing submitted jobs
pub struct WorkerPool {
    sender: Option<mpsc::Sender<Box<dyn Job>>>,
    results: Option<mpsc::UnboundedReceiver<JobResult>>,
    workers: Vec<JoinHandle<WorkerStats>>,
    occupancy: Arc<Occupancy>,
    stats: Vec<WorkerStats>,
}

impl WorkerPool {
    /// Starts `workers` workers behind a queue holding `queue_capacity` jobs
    ///
    /// Zero values are raised to one and the capacity is capped at
    /// [`MAX_QUEUE_CAPACITY`]. Must be called inside a tokio runtime.
    pub fn start(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.clamp(1, MAX_QUEUE_CAPACITY);
        let (sender, receiver) = mpsc::channel::<Box<dyn Job>>(queue_capacity);
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let queue: JobQueue = Arc::new(tokio::sync::Mutex::new(receiver));
        let occupancy = Arc::new(Occupancy {
            total: workers,
            busy: Mutex::new(0),
        });

        let handles = (1..=workers)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&queue),
                    result_tx.clone(),
                    Arc::clone(&occupancy),
                ))
            })
            .collect();

        tracing::info!("Started worker pool: {} workers, queue capacity {}", workers, queue_capacity);

        Self {
            sender: Some(sender),
            results: Some(result_rx),
            workers: handles,
            occupancy,
            stats: Vec::new(),
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::start(config.workers, config.queue_capacity)
    }

    /// Enqueues a job, waiting while the queue is full
    ///
    /// # Errors
    ///
    /// `ScanError::PoolClosed` once [`WorkerPool::close`] has been called.
    pub async fn submit(&self, job: Box<dyn Job>) -> crate::Result<()> {
        let sender = self.sender.as_ref().ok_or(ScanError::PoolClosed)?;
        tracing::debug!("Submitting {} job {}", job.kind(), job.id());
        sender.send(job).await.map_err(|_| ScanError::PoolClosed)
    }

    /// Hands out the completion-ordered result stream; `None` after the first call
    ///
    /// The stream ends once the pool is closed and every result was delivered.
    pub fn take_results(&mut self) -> Option<mpsc::UnboundedReceiver<JobResult>> {
        self.results.take()
    }

    pub fn status(&self) -> PoolStatus {
        self.occupancy.status()
    }

    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle {
            occupancy: Arc::clone(&self.occupancy),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// Stops accepting jobs, lets workers drain the queue and waits for them
    ///
    /// Returns the statistics of every worker. In-flight jobs are not
    /// cancelled. Calling it again returns the same statistics.
    pub async fn close(&mut self) -> &[WorkerStats] {
        if self.sender.take().is_some() {
            tracing::debug!("Closing worker pool, waiting for {} workers", self.workers.len());
        }

        for handle in self.workers.drain(..) {
            match handle.await {
                Ok(stats) => self.stats.push(stats),
                Err(e) => tracing::error!("Worker task did not complete: {}", e),
            }
        }
        self.stats.sort_by_key(|stats| stats.worker_id);

        &self.stats
    }

    /// Per-worker statistics; empty until the pool is closed
    pub fn worker_stats(&self) -> &[WorkerStats] {
        &self.stats
    }
}

async fn run_worker(
    id: usize,
    queue: JobQueue,
    results: mpsc::UnboundedSender<JobResult>,
    occupancy: Arc<Occupancy>,
) -> WorkerStats {
    let mut stats = WorkerStats::new(id);

    loop {
        // Lock is held only while waiting for the next job
        let job = queue.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        occupancy.mark_busy();
        tracing::info!("Worker {} starting {} job {}", id, job.kind(), job.id());

        let mut result = job.execute().await;
        result.worker_id = id;
        stats.record(&result);

        match &result.outcome {
            Ok(_) => tracing::info!("Worker {} finished {} job {}", id, job.kind(), job.id()),
            Err(e) => tracing::warn!("Worker {} finished {} job {} with error: {}", id, job.kind(), job.id(), e),
        }
        occupancy.mark_free();

        if results.send(result).is_err() {
            tracing::debug!("Result receiver dropped, discarding result of job {}", job.id());
        }
    }

    tracing::debug!("Worker {} stopping after {} jobs", id, stats.jobs_processed);
    stats
}
