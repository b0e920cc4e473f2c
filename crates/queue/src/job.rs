//! The per-job record owned by the queue.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use spritemill_core::types::{GenerationResult, ResolvedRequest};

/// Lifecycle state of one generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a concurrency slot (also the state between retry
    /// attempts while the backoff sleep runs).
    Queued,
    /// An execution attempt is in flight.
    Generating,
    Complete,
    Failed,
}

/// One generation job: the request, its status, and its outcome.
///
/// Owned exclusively by the queue for its lifetime; records become
/// garbage a fixed retention window after completion or failure.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationJob {
    pub id: Uuid,
    pub request: ResolvedRequest,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Execution attempts so far (starts at 0, incremented per attempt).
    pub attempts: u32,
    pub result: Option<GenerationResult>,
    pub error: Option<String>,
    /// Monotonic arrival sequence; breaks priority ties FIFO.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl GenerationJob {
    /// Create a fresh record in `Queued` state.
    pub(crate) fn new(request: ResolvedRequest, seq: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            attempts: 0,
            result: None,
            error: None,
            seq,
        }
    }
}
