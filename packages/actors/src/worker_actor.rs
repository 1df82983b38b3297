//! Worker actor for executing claimed jobs.

use std::sync::Arc;

use chrono::Utc;
use db::DbError;
use jobs_core::{Job, JobEvent, JobStatus, Operation, UnknownOperation};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::broadcast;

use crate::messages::{DispatcherMessage, JobOutcome, WorkerMessage};
use crate::store::JobStore;

/// State for the worker actor.
pub struct WorkerActorState {
    /// Unique worker ID.
    pub worker_id: String,
    /// Claim owner the worker writes on behalf of.
    pub owner: String,
    /// Job store used for terminal writes.
    pub store: Arc<dyn JobStore>,
    /// Dispatcher that hands out jobs and tracks completion.
    pub dispatcher: ActorRef<DispatcherMessage>,
    /// Event broadcaster.
    pub event_tx: broadcast::Sender<JobEvent>,
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub owner: String,
    pub store: Arc<dyn JobStore>,
    pub dispatcher: ActorRef<DispatcherMessage>,
    pub event_tx: broadcast::Sender<JobEvent>,
}

/// Worker actor that executes jobs.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::debug!("Starting worker: {}", args.worker_id);

        Ok(WorkerActorState {
            worker_id: args.worker_id,
            owner: args.owner,
            store: args.store,
            dispatcher: args.dispatcher,
            event_tx: args.event_tx,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::ProcessJob { job } => {
                let outcome = execute_job(state.store.as_ref(), &state.owner, &job).await;

                if let Some(event) = outcome_event(&job, &outcome) {
                    let _ = state.event_tx.send(event);
                }

                state.dispatcher.send_message(DispatcherMessage::JobFinished {
                    job_id: job.id,
                    worker_id: state.worker_id.clone(),
                    outcome,
                })?;
            }
        }

        Ok(())
    }
}

/// Apply a claimed job's operation and persist the terminal status.
///
/// An unknown action is written as `ERROR`. A failed result write gets
/// one fallback `ERROR` write; if that fails too the job stays claimed.
pub async fn execute_job(store: &dyn JobStore, owner: &str, job: &Job) -> JobOutcome {
    let operation = match job.action.parse::<Operation>() {
        Ok(operation) => operation,
        Err(e) => {
            tracing::warn!("Job {}: {}", job.id, e);
            return match store.update_job(&job.key, owner, JobStatus::Error, 0).await {
                Ok(_) => JobOutcome::Rejected {
                    action: job.action.clone(),
                },
                Err(e) => write_failed(job, e),
            };
        }
    };

    let result = operation.apply(&job.data);
    tracing::debug!("Job {}: {} over {} values = {}", job.id, operation, job.data.len(), result);

    match store
        .update_job(&job.key, owner, JobStatus::Processed, result)
        .await
    {
        Ok(_) => JobOutcome::Processed(result),
        Err(DbError::ClaimLost(msg)) => {
            tracing::warn!("Dropping result for job {}: {}", job.id, msg);
            JobOutcome::ClaimLost
        }
        Err(e) => {
            tracing::warn!("Failed to store result for job {}: {}", job.id, e);
            match store.update_job(&job.key, owner, JobStatus::Error, 0).await {
                Ok(_) => JobOutcome::Failed {
                    error: e.to_string(),
                },
                Err(fallback) => write_failed(job, fallback),
            }
        }
    }
}

pub(crate) fn write_failed(job: &Job, err: DbError) -> JobOutcome {
    match err {
        DbError::ClaimLost(msg) => {
            tracing::warn!("Dropping job {}: {}", job.id, msg);
            JobOutcome::ClaimLost
        }
        e => {
            tracing::error!(
                "Job {} left claimed after failed writes (attempt {}): {}",
                job.id,
                job.attempts,
                e
            );
            JobOutcome::Stranded {
                error: e.to_string(),
            }
        }
    }
}

pub(crate) fn outcome_event(job: &Job, outcome: &JobOutcome) -> Option<JobEvent> {
    let timestamp = Utc::now();
    match outcome {
        JobOutcome::Processed(result) => Some(JobEvent::JobProcessed {
            job_id: job.id,
            result: *result,
            timestamp,
        }),
        JobOutcome::Rejected { action } => Some(JobEvent::JobFailed {
            job_id: job.id,
            reason: UnknownOperation(action.clone()).to_string(),
            timestamp,
        }),
        JobOutcome::Failed { error } => Some(JobEvent::JobFailed {
            job_id: job.id,
            reason: error.clone(),
            timestamp,
        }),
        JobOutcome::Stranded { error } => Some(JobEvent::JobStranded {
            job_id: job.id,
            error: error.clone(),
            timestamp,
        }),
        JobOutcome::ClaimLost => None,
    }
}
