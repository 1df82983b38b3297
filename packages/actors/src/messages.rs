//! Message types for actor communication.

use jobs_core::{Job, JobId};
use ractor::RpcReplyPort;
use serde::{Deserialize, Serialize};

/// Messages for the Dispatcher.
#[derive(Debug)]
pub enum DispatcherMessage {
    /// Run one claim-and-dispatch cycle, then schedule the next one.
    Tick,

    /// A worker finished with a job it was handed.
    JobFinished {
        job_id: JobId,
        worker_id: String,
        outcome: JobOutcome,
    },

    /// Get dispatcher counters.
    GetStats { reply: RpcReplyPort<DispatcherStats> },
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Apply the job's operation and write the terminal status.
    ProcessJob { job: Box<Job> },
}

/// How a worker left a claimed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// `PROCESSED` with this result.
    Processed(i32),
    /// Unknown operation, written as `ERROR`.
    Rejected { action: String },
    /// The result write failed and the fallback `ERROR` write succeeded.
    Failed { error: String },
    /// Both writes failed; the job is still claimed.
    Stranded { error: String },
    /// Another owner holds the job now; nothing was written.
    ClaimLost,
}

impl JobOutcome {
    /// Whether a terminal status was stored.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobOutcome::Processed(_) | JobOutcome::Rejected { .. } | JobOutcome::Failed { .. }
        )
    }
}

/// Counters kept by the dispatcher since it started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherStats {
    pub ticks: u64,
    /// Ticks that found the previous batch still in flight.
    pub skipped_ticks: u64,
    pub claimed: u64,
    pub processed: u64,
    pub failed: u64,
    pub stranded: u64,
    pub in_flight: usize,
}

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("Failed to spawn actor: {0}")]
    Spawn(String),

    #[error("Actor error: {0}")]
    Actor(String),
}

impl From<ractor::SpawnErr> for ActorError {
    fn from(err: ractor::SpawnErr) -> Self {
        ActorError::Spawn(err.to_string())
    }
}
