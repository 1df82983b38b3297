//! Job repository: the durable record of every job.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jobs_core::{Job, JobId, JobKey, JobStatus, NewJob};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::{DbError, get_db};

/// Repository for job persistence operations.
pub struct JobRepository;

/// Internal record type for SurrealDB reads.
#[derive(Debug, Deserialize)]
struct JobRecord {
    id: Thing,
    job_id: JobId,
    status: JobStatus,
    data: Vec<i32>,
    action: String,
    #[serde(default)]
    result: i32,
    #[serde(default)]
    attempts: u32,
    #[serde(default)]
    owner: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRecord {
    fn into_job(self) -> Job {
        Job {
            key: JobKey::new(self.id.id.to_raw()),
            id: self.job_id,
            status: self.status,
            data: self.data,
            action: self.action,
            result: self.result,
            attempts: self.attempts,
            owner: self.owner,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Struct for creating jobs - omits status, result and datetime fields to use SurrealDB defaults.
#[derive(Debug, Clone, Serialize)]
struct JobCreate {
    job_id: String,
    data: Vec<i32>,
    action: String,
}

fn into_jobs(records: Vec<JobRecord>) -> Vec<Job> {
    records.into_iter().map(JobRecord::into_job).collect()
}

impl JobRepository {
    /// Insert a new `PENDING` job with result 0.
    pub async fn create(new_job: &NewJob) -> Result<Job, DbError> {
        new_job.validate()?;
        let db = get_db()?;

        let content = JobCreate {
            job_id: JobId::new().to_string(),
            data: new_job.data.clone(),
            action: new_job.action.clone(),
        };

        let mut result = db
            .query("CREATE job CONTENT $content RETURN AFTER")
            .bind(("content", content))
            .await?;

        let records: Vec<JobRecord> = result.take(0)?;

        records
            .into_iter()
            .next()
            .map(JobRecord::into_job)
            .ok_or_else(|| DbError::Query("Failed to create job".into()))
    }

    /// Get a job by its public ID.
    pub async fn get(id: JobId) -> Result<Job, DbError> {
        let db = get_db()?;

        let mut result = db
            .query("SELECT * FROM job WHERE job_id = $job_id LIMIT 1")
            .bind(("job_id", id.to_string()))
            .await?;

        let records: Vec<JobRecord> = result.take(0)?;

        records
            .into_iter()
            .next()
            .map(JobRecord::into_job)
            .ok_or_else(|| DbError::NotFound(format!("Job not found: {}", id)))
    }

    /// List every job, oldest first.
    pub async fn list_all() -> Result<Vec<Job>, DbError> {
        let db = get_db()?;

        let mut result = db
            .query("SELECT * FROM job ORDER BY created_at ASC")
            .await?;

        let records: Vec<JobRecord> = result.take(0)?;

        Ok(into_jobs(records))
    }

    /// List jobs with the given status, matched case-insensitively.
    ///
    /// An unknown status or an empty result is reported as `NotFound`.
    pub async fn list_by_status(status: &str) -> Result<Vec<Job>, DbError> {
        let status = JobStatus::parse(status)
            .ok_or_else(|| DbError::NotFound(format!("Unknown job status: {}", status)))?;

        let jobs = Self::with_status(status).await?;
        if jobs.is_empty() {
            return Err(DbError::NotFound(format!("No jobs with status {}", status)));
        }
        Ok(jobs)
    }

    /// Plain read of every `PENDING` job.
    ///
    /// This does not claim anything; concurrent callers see overlapping
    /// sets. Processing goes through [`JobRepository::claim_pending_batch`].
    pub async fn pending() -> Result<Vec<Job>, DbError> {
        Self::with_status(JobStatus::Pending).await
    }

    async fn with_status(status: JobStatus) -> Result<Vec<Job>, DbError> {
        let db = get_db()?;

        let mut result = db
            .query("SELECT * FROM job WHERE status = $status ORDER BY created_at ASC")
            .bind(("status", status.as_str()))
            .await?;

        let records: Vec<JobRecord> = result.take(0)?;

        Ok(into_jobs(records))
    }

    /// Claim up to `limit` of the oldest pending jobs for `owner`.
    ///
    /// Selection and the conditional `PENDING -> CLAIMED` update run in one
    /// transaction, and the update re-checks the status per row, so a job
    /// is returned to at most one caller.
    pub async fn claim_pending_batch(owner: &str, limit: usize) -> Result<Vec<Job>, DbError> {
        let db = get_db()?;

        let mut result = db
            .query(
                r#"
                BEGIN TRANSACTION;
                LET $batch = (
                    SELECT id, created_at FROM job
                    WHERE status = "PENDING"
                    ORDER BY created_at ASC
                    LIMIT $limit
                );
                LET $ids = $batch.id;
                UPDATE $ids SET
                    status = "CLAIMED",
                    owner = $owner,
                    attempts += 1,
                    claimed_at = time::now(),
                    updated_at = time::now()
                WHERE status = "PENDING"
                RETURN AFTER;
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("owner", owner.to_string()))
            .bind(("limit", limit as i64))
            .await?;

        let last = result
            .num_statements()
            .checked_sub(1)
            .ok_or_else(|| DbError::Query("Claim query returned no results".into()))?;
        let records: Vec<JobRecord> = result.take(last)?;

        Ok(into_jobs(records))
    }

    /// Write a terminal status and result for a job claimed by `owner`.
    ///
    /// The update only applies while the row is still `CLAIMED` by
    /// `owner`; otherwise nothing changes and `ClaimLost` is returned.
    pub async fn update_job(
        key: &JobKey,
        owner: &str,
        status: JobStatus,
        result: i32,
    ) -> Result<Job, DbError> {
        if !status.is_terminal() {
            return Err(DbError::Validation(format!(
                "{} is not a terminal status",
                status
            )));
        }
        let db = get_db()?;

        let mut response = db
            .query(
                r#"
                UPDATE type::thing("job", $key) SET
                    status = $status,
                    result = $result,
                    owner = NONE,
                    claimed_at = NONE,
                    updated_at = time::now()
                WHERE status = "CLAIMED" AND owner = $owner
                RETURN AFTER
                "#,
            )
            .bind(("key", key.as_str().to_string()))
            .bind(("status", status.as_str()))
            .bind(("result", result))
            .bind(("owner", owner.to_string()))
            .await?;

        let records: Vec<JobRecord> = response.take(0)?;

        records
            .into_iter()
            .next()
            .map(JobRecord::into_job)
            .ok_or_else(|| DbError::ClaimLost(format!("Job {} is not claimed by {}", key, owner)))
    }

    /// Return claims older than `older_than` to `PENDING`.
    pub async fn release_stale_claims(older_than: Duration) -> Result<usize, DbError> {
        let db = get_db()?;

        let mut response = db
            .query(
                r#"
                UPDATE job SET
                    status = "PENDING",
                    owner = NONE,
                    claimed_at = NONE,
                    updated_at = time::now()
                WHERE status = "CLAIMED"
                    AND claimed_at < time::now() - duration::from::millis($older_than_ms)
                RETURN AFTER
                "#,
            )
            .bind(("older_than_ms", older_than.as_millis() as i64))
            .await?;

        let records: Vec<JobRecord> = response.take(0)?;

        Ok(records.len())
    }
}
