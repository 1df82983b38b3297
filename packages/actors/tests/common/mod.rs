#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use actors::{BoxFuture, ConfigStore, JobStore, StoreFuture};
use chrono::Utc;
use db::DbError;
use jobs_core::{Job, JobEvent, JobId, JobKey, JobStatus, NewJob};
use tokio::sync::broadcast;

#[derive(Default)]
struct Rows {
    jobs: Vec<Job>,
    claimed_at: HashMap<JobKey, Instant>,
}

/// In-memory job store with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Rows>,
    /// Number of upcoming `update_job` calls that fail with a query error.
    failing_writes: AtomicUsize,
    fail_claims: AtomicBool,
    update_calls: AtomicUsize,
    next_key: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, action: &str, data: Vec<i32>) -> JobId {
        let key = self.next_key.fetch_add(1, Ordering::SeqCst);
        let job = Job::pending(NewJob::new(action, data)).with_key(JobKey::new(key.to_string()));
        let id = job.id;
        self.rows.lock().unwrap().jobs.push(job);
        id
    }

    pub fn get(&self, id: JobId) -> Option<Job> {
        self.rows
            .lock()
            .unwrap()
            .jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
    }

    pub fn all(&self) -> Vec<Job> {
        self.rows.lock().unwrap().jobs.clone()
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn fail_claims(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    fn take_write_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn claim(&self, owner: &str, limit: usize) -> Result<Vec<Job>, DbError> {
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(DbError::Query("claim unavailable".into()));
        }

        let mut rows = self.rows.lock().unwrap();
        let Rows { jobs, claimed_at } = &mut *rows;
        let now = Utc::now();

        let mut claimed = Vec::new();
        for job in jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending)
            .take(limit)
        {
            job.status = JobStatus::Claimed;
            job.owner = Some(owner.to_string());
            job.attempts += 1;
            job.updated_at = now;
            claimed_at.insert(job.key.clone(), Instant::now());
            claimed.push(job.clone());
        }
        Ok(claimed)
    }

    fn update(
        &self,
        key: &JobKey,
        owner: &str,
        status: JobStatus,
        result: i32,
    ) -> Result<Job, DbError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        if !status.is_terminal() {
            return Err(DbError::Validation(format!("{} is not terminal", status)));
        }
        if self.take_write_failure() {
            return Err(DbError::Query("write unavailable".into()));
        }

        let mut rows = self.rows.lock().unwrap();
        let job = rows
            .jobs
            .iter_mut()
            .find(|j| &j.key == key)
            .ok_or_else(|| DbError::NotFound(key.to_string()))?;

        if !job.status.can_transition_to(status) || job.owner.as_deref() != Some(owner) {
            return Err(DbError::ClaimLost(format!("job {} is not held by {}", job.id, owner)));
        }

        job.status = status;
        job.result = result;
        job.owner = None;
        job.updated_at = Utc::now();
        let updated = job.clone();
        rows.claimed_at.remove(key);
        Ok(updated)
    }

    fn release(&self, older_than: Duration) -> usize {
        let mut rows = self.rows.lock().unwrap();
        let Rows { jobs, claimed_at } = &mut *rows;

        let mut released = 0;
        for job in jobs.iter_mut().filter(|j| j.status == JobStatus::Claimed) {
            let stale = claimed_at
                .get(&job.key)
                .is_some_and(|at| at.elapsed() > older_than);
            if stale {
                job.status = JobStatus::Pending;
                job.owner = None;
                claimed_at.remove(&job.key);
                released += 1;
            }
        }
        released
    }
}

impl JobStore for MemoryStore {
    fn claim_pending_batch<'a>(
        &'a self,
        owner: &'a str,
        limit: usize,
    ) -> StoreFuture<'a, Vec<Job>> {
        Box::pin(async move { self.claim(owner, limit) })
    }

    fn update_job<'a>(
        &'a self,
        key: &'a JobKey,
        owner: &'a str,
        status: JobStatus,
        result: i32,
    ) -> StoreFuture<'a, Job> {
        Box::pin(async move { self.update(key, owner, status, result) })
    }

    fn release_stale_claims(&self, older_than: Duration) -> StoreFuture<'_, usize> {
        Box::pin(async move { Ok(self.release(older_than)) })
    }
}

/// Config store that always answers with the same interval.
pub struct FixedInterval(pub Duration);

impl ConfigStore for FixedInterval {
    fn polling_interval(&self) -> BoxFuture<'_, Duration> {
        let interval = self.0;
        Box::pin(async move { interval })
    }
}

/// Receive events until `pred` matches one, or fail after `within`.
pub async fn wait_for<F>(
    rx: &mut broadcast::Receiver<JobEvent>,
    within: Duration,
    mut pred: F,
) -> JobEvent
where
    F: FnMut(&JobEvent) -> bool,
{
    tokio::time::timeout(within, async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Poll `check` until it holds, or fail after `within`.
pub async fn eventually<F>(within: Duration, mut check: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + within;
    while !check() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
