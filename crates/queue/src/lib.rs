//! Bounded-concurrency priority scheduler for generation jobs.
//!
//! The queue runs at most `concurrency` jobs at once, honoring priority
//! order (FIFO within a tier), retrying transient failures with linear
//! backoff inside the same concurrency slot, and emitting lifecycle
//! events on the shared bus.
//!
//! - [`GenerationQueue`] — the scheduler.
//! - [`GenerationJob`] / [`JobStatus`] — the per-job record.
//! - [`JobExecutor`] — the work the queue runs for each job.

pub mod job;
pub mod queue;

pub use job::{GenerationJob, JobStatus};
pub use queue::{
    ExecutionError, GenerationQueue, JobExecutor, JobHandle, QueueConfig, QueueError,
};
