//! Dispatcher actor: the polling loop that claims pending jobs and feeds
//! them to a fixed pool of workers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jobs_core::{EngineConfig, Job, JobEvent, JobId, JobStatus};
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use tokio::sync::broadcast;

use crate::messages::{DispatcherMessage, DispatcherStats, JobOutcome, WorkerMessage};
use crate::store::{ConfigStore, JobStore};
use crate::worker_actor::{WorkerActor, WorkerArgs, outcome_event, write_failed};

/// A worker slot in the pool.
struct WorkerSlot {
    worker_id: String,
    actor: ActorRef<WorkerMessage>,
}

/// State for the dispatcher actor.
pub struct DispatcherState {
    /// Claim owner, unique per engine.
    owner: String,
    job_store: Arc<dyn JobStore>,
    config_store: Arc<dyn ConfigStore>,
    config: EngineConfig,
    event_tx: broadcast::Sender<JobEvent>,
    workers: Vec<WorkerSlot>,
    /// Round-robin cursor into `workers`.
    next_worker: usize,
    /// Jobs handed to a worker and not yet reported back, by worker id.
    in_flight: HashMap<JobId, String>,
    stats: DispatcherStats,
    /// Worker counter for unique IDs.
    worker_counter: u64,
}

/// Dispatcher actor arguments.
pub struct DispatcherArgs {
    pub owner: String,
    pub job_store: Arc<dyn JobStore>,
    pub config_store: Arc<dyn ConfigStore>,
    pub config: EngineConfig,
    pub event_tx: broadcast::Sender<JobEvent>,
}

impl DispatcherState {
    fn new(args: DispatcherArgs) -> Self {
        Self {
            owner: args.owner,
            job_store: args.job_store,
            config_store: args.config_store,
            config: args.config,
            event_tx: args.event_tx,
            workers: Vec::new(),
            next_worker: 0,
            in_flight: HashMap::new(),
            stats: DispatcherStats::default(),
            worker_counter: 0,
        }
    }

    /// Generate a unique worker ID.
    fn next_worker_id(&mut self) -> String {
        self.worker_counter += 1;
        format!("{}-worker-{}", self.owner, self.worker_counter)
    }

    fn broadcast(&self, event: JobEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn spawn_worker(
        &mut self,
        myself: &ActorRef<DispatcherMessage>,
    ) -> Result<WorkerSlot, ActorProcessingErr> {
        let worker_id = self.next_worker_id();
        let args = WorkerArgs {
            worker_id: worker_id.clone(),
            owner: self.owner.clone(),
            store: self.job_store.clone(),
            dispatcher: myself.clone(),
            event_tx: self.event_tx.clone(),
        };

        let (actor, _handle) = Actor::spawn_linked(None, WorkerActor, args, myself.get_cell())
            .await
            .map_err(|e| ActorProcessingErr::from(format!("Failed to spawn worker: {}", e)))?;

        Ok(WorkerSlot { worker_id, actor })
    }

    /// One claim-and-dispatch cycle.
    async fn tick(&mut self) {
        self.stats.ticks += 1;

        if !self.in_flight.is_empty() {
            tracing::debug!(
                "Previous batch still in flight ({} jobs), skipping claim",
                self.in_flight.len()
            );
            self.stats.skipped_ticks += 1;
            self.broadcast(JobEvent::TickSkipped {
                in_flight: self.in_flight.len(),
                timestamp: Utc::now(),
            });
            return;
        }

        match self
            .job_store
            .release_stale_claims(self.config.stale_claim_after)
            .await
        {
            Ok(0) => {}
            Ok(count) => {
                tracing::info!("Released {} stale claims", count);
                self.broadcast(JobEvent::ClaimsReleased {
                    count,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => tracing::warn!("Failed to release stale claims: {}", e),
        }

        let jobs = match self
            .job_store
            .claim_pending_batch(&self.owner, self.config.claim_batch)
            .await
        {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!("Failed to claim pending jobs: {}", e);
                self.broadcast(JobEvent::ClaimFailed {
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                return;
            }
        };

        if !jobs.is_empty() {
            tracing::debug!("Claimed {} jobs", jobs.len());
        }

        for job in jobs {
            self.stats.claimed += 1;
            self.broadcast(JobEvent::JobClaimed {
                job_id: job.id,
                owner: self.owner.clone(),
                attempt: job.attempts,
                timestamp: Utc::now(),
            });

            if job.attempts > self.config.max_attempts {
                self.abandon(job).await;
            } else {
                self.dispatch(job);
            }
        }
    }

    /// Force a job that keeps getting re-offered to `ERROR`.
    async fn abandon(&mut self, job: Job) {
        let reason = format!("gave up after {} attempts", job.attempts - 1);
        tracing::warn!("Job {} {}", job.id, reason);

        let outcome = match self
            .job_store
            .update_job(&job.key, &self.owner, JobStatus::Error, 0)
            .await
        {
            Ok(_) => JobOutcome::Failed { error: reason },
            Err(e) => write_failed(&job, e),
        };

        if let Some(event) = outcome_event(&job, &outcome) {
            self.broadcast(event);
        }
        self.record(&outcome);
    }

    fn dispatch(&mut self, job: Job) {
        if self.workers.is_empty() {
            tracing::error!("No workers available for job {}", job.id);
            return;
        }

        let slot = &self.workers[self.next_worker % self.workers.len()];
        self.next_worker = self.next_worker.wrapping_add(1);

        let job_id = job.id;
        let worker_id = slot.worker_id.clone();
        match slot
            .actor
            .send_message(WorkerMessage::ProcessJob { job: Box::new(job) })
        {
            Ok(()) => {
                self.in_flight.insert(job_id, worker_id);
            }
            Err(e) => {
                // The claim stays until it goes stale.
                tracing::warn!("Failed to hand job {} to {}: {}", job_id, worker_id, e);
            }
        }
    }

    fn finish(&mut self, job_id: JobId, worker_id: &str, outcome: JobOutcome) {
        self.in_flight.remove(&job_id);
        self.record(&outcome);
        tracing::trace!("Job {} finished on {}", job_id, worker_id);
    }

    fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Processed(_) => self.stats.processed += 1,
            JobOutcome::Rejected { .. } | JobOutcome::Failed { .. } => self.stats.failed += 1,
            JobOutcome::Stranded { .. } => self.stats.stranded += 1,
            JobOutcome::ClaimLost => {}
        }
    }

    async fn schedule_next_tick(&self, myself: &ActorRef<DispatcherMessage>) {
        let interval = self.config_store.polling_interval().await;
        schedule_tick(myself.clone(), interval);
    }
}

/// Send a `Tick` to the dispatcher after `after`.
fn schedule_tick(myself: ActorRef<DispatcherMessage>, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        // Fails only once the dispatcher has stopped.
        let _ = myself.send_message(DispatcherMessage::Tick);
    });
}

/// Dispatcher actor that drives the polling loop.
pub struct Dispatcher;

impl Actor for Dispatcher {
    type Msg = DispatcherMessage;
    type State = DispatcherState;
    type Arguments = DispatcherArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let mut state = DispatcherState::new(args);

        tracing::info!(
            "Starting dispatcher {} with {} workers",
            state.owner,
            state.config.workers
        );

        for _ in 0..state.config.workers.max(1) {
            let slot = state.spawn_worker(&myself).await?;
            state.workers.push(slot);
        }

        myself.send_message(DispatcherMessage::Tick)?;

        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DispatcherMessage::Tick => {
                state.tick().await;
                state.schedule_next_tick(&myself).await;
            }

            DispatcherMessage::JobFinished {
                job_id,
                worker_id,
                outcome,
            } => {
                state.finish(job_id, &worker_id, outcome);
            }

            DispatcherMessage::GetStats { reply } => {
                let mut stats = state.stats.clone();
                stats.in_flight = state.in_flight.len();
                let _ = reply.send(stats);
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!("Shutting down dispatcher {}", state.owner);
        for slot in &state.workers {
            slot.actor.stop(None);
        }
        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let (cell, reason) = match message {
            SupervisionEvent::ActorTerminated(cell, _, reason) => (cell, reason),
            SupervisionEvent::ActorFailed(cell, err) => (cell, Some(err.to_string())),
            _ => return Ok(()),
        };

        let Some(index) = state
            .workers
            .iter()
            .position(|slot| slot.actor.get_id() == cell.get_id())
        else {
            return Ok(());
        };

        let lost = state.workers.remove(index);
        tracing::warn!("Worker {} terminated: {:?}", lost.worker_id, reason);

        // Its jobs stay claimed until the claims go stale.
        state.in_flight.retain(|_, worker_id| *worker_id != lost.worker_id);

        let slot = state.spawn_worker(&myself).await?;
        state.workers.insert(index, slot);

        Ok(())
    }
}
