//! Store seams consumed by the engine.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use db::DbError;
use db::repositories::{ConfigRepository, JobRepository};
use jobs_core::{Job, JobKey, JobStatus};

/// Future type for fallible store calls.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DbError>> + Send + 'a>>;

/// Future type for store calls that cannot fail outward.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The parts of the job store the engine needs.
///
/// `claim_pending_batch` must hand each pending job to at most one owner,
/// and `update_job` must only apply while the caller still owns the claim.
pub trait JobStore: Send + Sync + 'static {
    /// Move up to `limit` pending jobs to `CLAIMED(owner)` and return them.
    fn claim_pending_batch<'a>(&'a self, owner: &'a str, limit: usize)
    -> StoreFuture<'a, Vec<Job>>;

    /// Write a terminal status for a job claimed by `owner`.
    fn update_job<'a>(
        &'a self,
        key: &'a JobKey,
        owner: &'a str,
        status: JobStatus,
        result: i32,
    ) -> StoreFuture<'a, Job>;

    /// Return claims older than `older_than` to `PENDING`.
    fn release_stale_claims(&self, older_than: Duration) -> StoreFuture<'_, usize>;
}

/// Source of the polling interval.
pub trait ConfigStore: Send + Sync + 'static {
    /// Delay before the next tick. Falls back to a default instead of failing.
    fn polling_interval(&self) -> BoxFuture<'_, Duration>;
}

/// Both stores backed by the SurrealDB repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurrealStore;

impl JobStore for SurrealStore {
    fn claim_pending_batch<'a>(
        &'a self,
        owner: &'a str,
        limit: usize,
    ) -> StoreFuture<'a, Vec<Job>> {
        Box::pin(JobRepository::claim_pending_batch(owner, limit))
    }

    fn update_job<'a>(
        &'a self,
        key: &'a JobKey,
        owner: &'a str,
        status: JobStatus,
        result: i32,
    ) -> StoreFuture<'a, Job> {
        Box::pin(JobRepository::update_job(key, owner, status, result))
    }

    fn release_stale_claims(&self, older_than: Duration) -> StoreFuture<'_, usize> {
        Box::pin(JobRepository::release_stale_claims(older_than))
    }
}

impl ConfigStore for SurrealStore {
    fn polling_interval(&self) -> BoxFuture<'_, Duration> {
        Box::pin(ConfigRepository::polling_interval())
    }
}
