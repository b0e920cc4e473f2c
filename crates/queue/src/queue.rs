//! The generation queue scheduler.
//!
//! A single dispatcher task acquires a semaphore permit, pops the best
//! `(priority rank, arrival seq)` entry, and runs the job in a spawned
//! task that holds the permit until the job finishes — including across
//! retries, so retry activity can never exceed the concurrency limit.
//! Retries are an explicit attempt loop with linear backoff, not
//! recursion.
//!
//! A second task sweeps finished job records out of the table after a
//! retention window so memory stays bounded while recent jobs remain
//! queryable.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{oneshot, Mutex, Notify, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use spritemill_core::types::{GenerationResult, QueueStats, ResolvedRequest};
use spritemill_events::{AssetEvent, EventBus};

use crate::job::{GenerationJob, JobStatus};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for the scheduler.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of jobs in `Generating` state at once.
    pub concurrency: usize,
    /// Total execution attempts per job (first attempt included).
    pub max_retries: u32,
    /// Linear backoff unit: attempt N sleeps `N * backoff_unit`.
    pub backoff_unit: Duration,
    /// Hard bound on one execution attempt; exceeding it counts as a
    /// transient failure.
    pub attempt_timeout: Duration,
    /// How long finished job records stay queryable.
    pub retention: Duration,
    /// How often the retention sweep runs.
    pub sweep_interval: Duration,
    /// Per-job wait estimate used before any completion was observed.
    pub default_job_estimate_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            max_retries: 3,
            backoff_unit: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(120),
            retention: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
            default_job_estimate_ms: 15_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Executor contract & errors
// ---------------------------------------------------------------------------

/// The work the queue performs for each job.
///
/// The pipeline implements this with select-provider → generate →
/// post-process → cache-write.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: &GenerationJob) -> Result<GenerationResult, ExecutionError>;
}

/// Failure of one execution attempt.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Retrying cannot help (validation, missing credentials). Fails the
    /// job immediately.
    #[error("{0}")]
    Fatal(String),

    /// Worth retrying (provider error, timeout).
    #[error("{0}")]
    Transient(String),
}

/// Why a job handle resolved with an error.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The job was cancelled while still queued.
    #[error("Job was cancelled")]
    Cancelled,

    /// The queue was cleared while the job was still queued.
    #[error("Queue was cleared")]
    Cleared,

    /// Retries were exhausted (or the failure was fatal).
    #[error("Job failed: {0}")]
    Failed(String),

    /// The queue shut down before the job resolved.
    #[error("Queue is shutting down")]
    ShutDown,
}

/// Caller-side handle for an enqueued job.
pub struct JobHandle {
    pub job_id: Uuid,
    rx: oneshot::Receiver<Result<GenerationResult, QueueError>>,
}

impl JobHandle {
    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<GenerationResult, QueueError> {
        self.rx.await.map_err(|_| QueueError::ShutDown)?
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// Heap entry ordered so the binary max-heap pops the lowest
/// `(rank, seq)` pair: higher priority first, FIFO within a tier.
#[derive(Debug, PartialEq, Eq)]
struct QueuedEntry {
    rank: u8,
    seq: u64,
    job_id: Uuid,
}

impl Ord for QueuedEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (other.rank, other.seq).cmp(&(self.rank, self.seq))
    }
}

impl PartialOrd for QueuedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

type Waiter = oneshot::Sender<Result<GenerationResult, QueueError>>;

#[derive(Default)]
struct QueueState {
    jobs: HashMap<Uuid, GenerationJob>,
    heap: BinaryHeap<QueuedEntry>,
    waiters: HashMap<Uuid, Waiter>,
    executors: HashMap<Uuid, Arc<dyn JobExecutor>>,
}

struct QueueInner {
    config: QueueConfig,
    state: Mutex<QueueState>,
    notify: Notify,
    semaphore: Arc<Semaphore>,
    paused: AtomicBool,
    seq: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    /// Running average of completion times, for wait estimation.
    avg_total_ms: AtomicU64,
    avg_samples: AtomicU64,
    bus: Arc<EventBus>,
}

// ---------------------------------------------------------------------------
// GenerationQueue
// ---------------------------------------------------------------------------

/// Bounded-concurrency priority scheduler for generation jobs.
pub struct GenerationQueue {
    inner: Arc<QueueInner>,
    cancel: CancellationToken,
}

impl GenerationQueue {
    /// Create the queue and spawn its dispatcher and retention tasks.
    pub fn start(config: QueueConfig, bus: Arc<EventBus>) -> Arc<Self> {
        let inner = Arc::new(QueueInner {
            semaphore: Arc::new(Semaphore::new(config.concurrency)),
            config,
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            paused: AtomicBool::new(false),
            seq: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            avg_total_ms: AtomicU64::new(0),
            avg_samples: AtomicU64::new(0),
            bus,
        });
        let cancel = CancellationToken::new();

        tokio::spawn(dispatch_loop(Arc::clone(&inner), cancel.clone()));
        tokio::spawn(retention_loop(Arc::clone(&inner), cancel.clone()));

        Arc::new(Self { inner, cancel })
    }

    /// Register a job and submit it for dispatch.
    ///
    /// Returns the job record as enqueued plus a handle that resolves
    /// when the job finishes. Dropping the handle is fine — the job
    /// still runs (fire-and-forget pre-generation relies on this).
    pub async fn enqueue(
        &self,
        request: ResolvedRequest,
        executor: Arc<dyn JobExecutor>,
    ) -> (GenerationJob, JobHandle) {
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let job = GenerationJob::new(request, seq);
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.inner.state.lock().await;
            state.heap.push(QueuedEntry {
                rank: job.request.priority.rank(),
                seq,
                job_id: job.id,
            });
            state.waiters.insert(job.id, tx);
            state.executors.insert(job.id, executor);
            state.jobs.insert(job.id, job.clone());
        }

        self.inner.notify.notify_one();
        self.inner.bus.publish(AssetEvent::JobQueued {
            job_id: job.id,
            asset_type: job.request.asset_type,
            priority: job.request.priority,
            session_id: job.request.session_id.clone(),
        });
        tracing::debug!(
            job_id = %job.id,
            asset_type = %job.request.asset_type,
            priority = ?job.request.priority,
            "Job enqueued",
        );

        let handle = JobHandle {
            job_id: job.id,
            rx,
        };
        (job, handle)
    }

    /// Fetch a job record (present until the retention sweep drops it).
    pub async fn get_job(&self, job_id: Uuid) -> Option<GenerationJob> {
        self.inner.state.lock().await.jobs.get(&job_id).cloned()
    }

    /// All currently tracked job records.
    pub async fn get_all_jobs(&self) -> Vec<GenerationJob> {
        self.inner.state.lock().await.jobs.values().cloned().collect()
    }

    /// 1-based rank of a queued job among all queued jobs, by arrival.
    ///
    /// `None` when the job is unknown or no longer queued.
    pub async fn position(&self, job_id: Uuid) -> Option<usize> {
        let state = self.inner.state.lock().await;
        let job = state.jobs.get(&job_id)?;
        if job.status != JobStatus::Queued {
            return None;
        }
        let ahead = state
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Queued && j.seq < job.seq)
            .count();
        Some(ahead + 1)
    }

    /// Estimated wait for a queued job, in milliseconds:
    /// `active_average + (position - 1) * per_job_estimate`.
    pub async fn estimated_wait_ms(&self, job_id: Uuid) -> Option<u64> {
        let position = self.position(job_id).await?;
        let per_job = self.inner.config.default_job_estimate_ms;
        let samples = self.inner.avg_samples.load(Ordering::Relaxed);
        let active_avg = if samples == 0 {
            per_job
        } else {
            self.inner.avg_total_ms.load(Ordering::Relaxed) / samples
        };
        Some(active_avg + (position as u64 - 1) * per_job)
    }

    /// Cancel a job that has not started yet.
    ///
    /// The handle is rejected with [`QueueError::Cancelled`] and the
    /// record is removed immediately. Jobs already generating run to
    /// completion; returns false for those.
    pub async fn cancel(&self, job_id: Uuid) -> bool {
        let mut state = self.inner.state.lock().await;
        match state.jobs.get(&job_id) {
            Some(job) if job.status == JobStatus::Queued => {
                state.jobs.remove(&job_id);
                state.executors.remove(&job_id);
                if let Some(waiter) = state.waiters.remove(&job_id) {
                    let _ = waiter.send(Err(QueueError::Cancelled));
                }
                tracing::info!(job_id = %job_id, "Queued job cancelled");
                true
            }
            _ => false,
        }
    }

    /// Suspend dispatch. Running jobs are unaffected.
    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::Relaxed);
        tracing::info!("Queue paused");
    }

    /// Resume dispatch.
    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::Relaxed);
        self.inner.notify.notify_one();
        tracing::info!("Queue resumed");
    }

    /// Drop every not-yet-started job, rejecting each handle with
    /// [`QueueError::Cleared`]. Returns the number of jobs dropped.
    pub async fn clear(&self) -> usize {
        let mut state = self.inner.state.lock().await;
        let queued: Vec<Uuid> = state
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Queued)
            .map(|j| j.id)
            .collect();

        for id in &queued {
            state.jobs.remove(id);
            state.executors.remove(id);
            if let Some(waiter) = state.waiters.remove(id) {
                let _ = waiter.send(Err(QueueError::Cleared));
            }
        }
        // Entries for generating jobs are not in the heap, so dropping
        // it wholesale is safe.
        state.heap.clear();

        tracing::info!(dropped = queued.len(), "Queue cleared");
        queued.len()
    }

    /// Aggregate queue counters.
    pub async fn stats(&self) -> QueueStats {
        let state = self.inner.state.lock().await;
        let pending = state
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Queued)
            .count();
        let active = state
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Generating)
            .count();
        QueueStats {
            pending,
            active,
            completed: self.inner.completed.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
            size: state.jobs.len(),
        }
    }

    /// Stop the dispatcher and retention tasks.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for GenerationQueue {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Long-lived task: permit → pop best entry → spawn the job run.
async fn dispatch_loop(inner: Arc<QueueInner>, cancel: CancellationToken) {
    tracing::debug!(
        concurrency = inner.config.concurrency,
        "Queue dispatcher started",
    );

    loop {
        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&inner.semaphore).acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };

        // Wait until a dispatchable entry exists and dispatch is not paused.
        let job_id = loop {
            if !inner.paused.load(Ordering::Relaxed) {
                if let Some(id) = pop_next(&inner).await {
                    break id;
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = inner.notify.notified() => {}
            }
        };

        let run_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            run_job(run_inner, job_id, permit).await;
        });
    }

    tracing::debug!("Queue dispatcher stopped");
}

/// Pop the best queued entry, skipping records removed by
/// cancel/clear (their heap entries go stale rather than being dug out
/// of the heap).
async fn pop_next(inner: &QueueInner) -> Option<Uuid> {
    let mut state = inner.state.lock().await;
    while let Some(entry) = state.heap.pop() {
        match state.jobs.get(&entry.job_id) {
            Some(job) if job.status == JobStatus::Queued => return Some(entry.job_id),
            _ => continue,
        }
    }
    None
}

/// Run one job to completion or failure, retrying transient errors
/// inside the same concurrency slot.
async fn run_job(inner: Arc<QueueInner>, job_id: Uuid, permit: OwnedSemaphorePermit) {
    let executor = inner.state.lock().await.executors.get(&job_id).cloned();
    let Some(executor) = executor else {
        // Cancelled between pop and spawn.
        return;
    };

    loop {
        let snapshot = {
            let mut state = inner.state.lock().await;
            let Some(job) = state.jobs.get_mut(&job_id) else {
                return;
            };
            job.status = JobStatus::Generating;
            job.started_at = Some(Utc::now());
            job.attempts += 1;
            job.clone()
        };
        let attempt = snapshot.attempts;

        inner
            .bus
            .publish(AssetEvent::JobStarted { job_id, attempt });
        tracing::debug!(job_id = %job_id, attempt, "Job attempt started");

        let started = std::time::Instant::now();
        let outcome =
            match tokio::time::timeout(inner.config.attempt_timeout, executor.execute(&snapshot))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ExecutionError::Transient(format!(
                    "attempt timed out after {:?}",
                    inner.config.attempt_timeout
                ))),
            };

        match outcome {
            Ok(result) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                inner.avg_total_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
                inner.avg_samples.fetch_add(1, Ordering::Relaxed);
                finish_job(&inner, job_id, Ok(result)).await;
                break;
            }
            Err(ExecutionError::Fatal(message)) => {
                tracing::error!(job_id = %job_id, attempt, error = %message, "Job failed fatally");
                finish_job(&inner, job_id, Err(message)).await;
                break;
            }
            Err(ExecutionError::Transient(message)) => {
                if attempt < inner.config.max_retries {
                    {
                        let mut state = inner.state.lock().await;
                        if let Some(job) = state.jobs.get_mut(&job_id) {
                            job.status = JobStatus::Queued;
                            job.error = Some(message.clone());
                        }
                    }
                    tracing::warn!(
                        job_id = %job_id,
                        attempt,
                        error = %message,
                        "Attempt failed, retrying in same slot",
                    );
                    // Linear backoff; the permit stays held so retries
                    // never amplify concurrency.
                    tokio::time::sleep(inner.config.backoff_unit * attempt).await;
                    continue;
                }
                tracing::error!(
                    job_id = %job_id,
                    attempt,
                    error = %message,
                    "Retries exhausted, job failed",
                );
                finish_job(&inner, job_id, Err(message)).await;
                break;
            }
        }
    }

    drop(permit);
}

/// Record the terminal state, resolve the waiter, and publish the event.
async fn finish_job(inner: &QueueInner, job_id: Uuid, outcome: Result<GenerationResult, String>) {
    let event = {
        let mut state = inner.state.lock().await;
        state.executors.remove(&job_id);
        let waiter = state.waiters.remove(&job_id);
        let Some(job) = state.jobs.get_mut(&job_id) else {
            return;
        };
        job.completed_at = Some(Utc::now());

        match outcome {
            Ok(result) => {
                job.status = JobStatus::Complete;
                job.result = Some(result.clone());
                inner.completed.fetch_add(1, Ordering::Relaxed);
                if let Some(waiter) = waiter {
                    let _ = waiter.send(Ok(result.clone()));
                }
                AssetEvent::JobCompleted { job_id, result }
            }
            Err(message) => {
                job.status = JobStatus::Failed;
                job.error = Some(message.clone());
                inner.failed.fetch_add(1, Ordering::Relaxed);
                if let Some(waiter) = waiter {
                    let _ = waiter.send(Err(QueueError::Failed(message.clone())));
                }
                AssetEvent::JobFailed {
                    job_id,
                    error: message,
                }
            }
        }
    };
    inner.bus.publish(event);
}

// ---------------------------------------------------------------------------
// Retention sweep
// ---------------------------------------------------------------------------

/// Periodically drop finished job records older than the retention
/// window.
async fn retention_loop(inner: Arc<QueueInner>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(inner.config.sweep_interval);
    let retention_ms = inner.config.retention.as_millis() as i64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let now = Utc::now();
        let mut state = inner.state.lock().await;
        let expired: Vec<Uuid> = state
            .jobs
            .values()
            .filter(|j| {
                matches!(j.status, JobStatus::Complete | JobStatus::Failed)
                    && j.completed_at
                        .is_some_and(|t| now.signed_duration_since(t).num_milliseconds() > retention_ms)
            })
            .map(|j| j.id)
            .collect();

        if !expired.is_empty() {
            for id in &expired {
                state.jobs.remove(id);
                state.waiters.remove(id);
                state.executors.remove(id);
            }
            tracing::debug!(swept = expired.len(), "Retention sweep removed finished jobs");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
