//! Job domain types and the job lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Longest action name accepted at creation.
pub const MAX_ACTION_LEN: usize = 64;

/// Public identifier for a job, exposed to clients and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage identity of a job record.
///
/// Assigned by the store on insert and used for claiming and updating.
/// Never serialized to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JobKey(pub String);

impl JobKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a job.
///
/// `Pending -> Claimed -> Processed | Error`. A claim that goes stale is
/// released back to `Pending`; terminal statuses never change again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Waiting to be claimed by a dispatcher.
    #[default]
    Pending,
    /// Claimed by a dispatcher and in flight on one of its workers.
    Claimed,
    /// Operation applied and result stored.
    Processed,
    /// Unknown operation, failed write, or too many attempts.
    Error,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Processed | JobStatus::Error)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Claimed) | (Claimed, Processed) | (Claimed, Error) | (Claimed, Pending)
        )
    }

    /// Stored/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Claimed => "CLAIMED",
            JobStatus::Processed => "PROCESSED",
            JobStatus::Error => "ERROR",
        }
    }

    /// Case-insensitive parse of a status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(JobStatus::Pending),
            "CLAIMED" => Some(JobStatus::Claimed),
            "PROCESSED" => Some(JobStatus::Processed),
            "ERROR" => Some(JobStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected create request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("action must not be empty")]
    EmptyAction,
    #[error("action is longer than {MAX_ACTION_LEN} characters")]
    ActionTooLong,
}

/// A request to create a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    #[serde(default)]
    pub data: Vec<i32>,
    pub action: String,
}

impl NewJob {
    pub fn new(action: impl Into<String>, data: Vec<i32>) -> Self {
        Self {
            data,
            action: action.into(),
        }
    }

    /// Check the constraints the store enforces on `action`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.action.trim().is_empty() {
            return Err(ValidationError::EmptyAction);
        }
        if self.action.chars().count() > MAX_ACTION_LEN {
            return Err(ValidationError::ActionTooLong);
        }
        Ok(())
    }
}

/// A unit of requested computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Storage key, filled in by the repository.
    #[serde(skip)]
    pub key: JobKey,
    /// Public identifier.
    pub id: JobId,
    pub status: JobStatus,
    /// Integer payload, immutable after creation.
    pub data: Vec<i32>,
    /// Operation name, immutable after creation.
    pub action: String,
    /// Only meaningful when `status` is `Processed`.
    #[serde(default)]
    pub result: i32,
    /// Number of times the job has been claimed.
    #[serde(default)]
    pub attempts: u32,
    /// Dispatcher currently holding the claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a fresh pending job from a create request.
    pub fn pending(new_job: NewJob) -> Self {
        let now = Utc::now();
        Self {
            key: JobKey::default(),
            id: JobId::new(),
            status: JobStatus::Pending,
            data: new_job.data,
            action: new_job.action,
            result: 0,
            attempts: 0,
            owner: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the storage key.
    pub fn with_key(mut self, key: JobKey) -> Self {
        self.key = key;
        self
    }
}
