//! Events published by the worker engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Observable engine activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// A dispatcher claimed a job.
    JobClaimed {
        job_id: JobId,
        owner: String,
        attempt: u32,
        timestamp: DateTime<Utc>,
    },
    /// A job reached `PROCESSED`.
    JobProcessed {
        job_id: JobId,
        result: i32,
        timestamp: DateTime<Utc>,
    },
    /// A job reached `ERROR`.
    JobFailed {
        job_id: JobId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// Neither the result nor the fallback could be written; the job
    /// stays claimed until its claim goes stale.
    JobStranded {
        job_id: JobId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// Stale claims were returned to `PENDING`.
    ClaimsReleased { count: usize, timestamp: DateTime<Utc> },
    /// Claiming from the store failed; the tick was abandoned.
    ClaimFailed { error: String, timestamp: DateTime<Utc> },
    /// A tick found the previous batch still in flight.
    TickSkipped { in_flight: usize, timestamp: DateTime<Utc> },
}

impl JobEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::JobClaimed { timestamp, .. } => *timestamp,
            JobEvent::JobProcessed { timestamp, .. } => *timestamp,
            JobEvent::JobFailed { timestamp, .. } => *timestamp,
            JobEvent::JobStranded { timestamp, .. } => *timestamp,
            JobEvent::ClaimsReleased { timestamp, .. } => *timestamp,
            JobEvent::ClaimFailed { timestamp, .. } => *timestamp,
            JobEvent::TickSkipped { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            JobEvent::JobClaimed { job_id, .. } => Some(*job_id),
            JobEvent::JobProcessed { job_id, .. } => Some(*job_id),
            JobEvent::JobFailed { job_id, .. } => Some(*job_id),
            JobEvent::JobStranded { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }

    /// Whether the event records a terminal write.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::JobProcessed { .. } | JobEvent::JobFailed { .. }
        )
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobEvent::JobClaimed {
                job_id,
                owner,
                attempt,
                ..
            } => format!("Job {} claimed by {} (attempt {})", job_id, owner, attempt),
            JobEvent::JobProcessed { job_id, result, .. } => {
                format!("Job {} processed: {}", job_id, result)
            }
            JobEvent::JobFailed { job_id, reason, .. } => {
                format!("Job {} failed: {}", job_id, reason)
            }
            JobEvent::JobStranded { job_id, error, .. } => {
                format!("Job {} stranded: {}", job_id, error)
            }
            JobEvent::ClaimsReleased { count, .. } => format!("{} stale claims released", count),
            JobEvent::ClaimFailed { error, .. } => format!("Claim failed: {}", error),
            JobEvent::TickSkipped { in_flight, .. } => {
                format!("Tick skipped, {} jobs in flight", in_flight)
            }
        }
    }
}
