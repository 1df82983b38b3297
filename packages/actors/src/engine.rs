//! Engine entry point: spawns a dispatcher and hands back a handle to it.

use std::sync::Arc;

use jobs_core::{EngineConfig, JobEvent};
use ractor::{Actor, ActorRef};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use ulid::Ulid;

use crate::dispatcher::{Dispatcher, DispatcherArgs};
use crate::messages::{ActorError, DispatcherMessage, DispatcherStats};
use crate::store::{ConfigStore, JobStore, SurrealStore};

/// Capacity of the event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A job-processing engine over a job store and a config store.
///
/// Several engines may share one store; claims keep them from processing
/// the same job twice.
pub struct Engine {
    job_store: Arc<dyn JobStore>,
    config_store: Arc<dyn ConfigStore>,
    config: EngineConfig,
    event_tx: broadcast::Sender<JobEvent>,
}

impl Engine {
    /// Create an engine over the given stores with the default config.
    pub fn new(job_store: Arc<dyn JobStore>, config_store: Arc<dyn ConfigStore>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            job_store,
            config_store,
            config: EngineConfig::default(),
            event_tx,
        }
    }

    /// Create an engine over the SurrealDB repositories.
    pub fn surreal() -> Self {
        Self::new(Arc::new(SurrealStore), Arc::new(SurrealStore))
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Subscribe to job events before the engine starts.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Spawn the dispatcher and its workers. The first tick runs right away.
    pub async fn start(self) -> Result<EngineHandle, ActorError> {
        let owner = format!("dispatcher-{}", Ulid::new());

        let args = DispatcherArgs {
            owner: owner.clone(),
            job_store: self.job_store,
            config_store: self.config_store,
            config: self.config,
            event_tx: self.event_tx.clone(),
        };

        let (dispatcher, join) = Actor::spawn(Some(owner.clone()), Dispatcher, args).await?;

        tracing::info!("Engine {} started", owner);

        Ok(EngineHandle {
            owner,
            dispatcher,
            join,
            event_tx: self.event_tx,
        })
    }
}

/// Handle to a running engine.
pub struct EngineHandle {
    owner: String,
    dispatcher: ActorRef<DispatcherMessage>,
    join: JoinHandle<()>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl EngineHandle {
    /// Claim owner used by this engine.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    pub fn dispatcher(&self) -> &ActorRef<DispatcherMessage> {
        &self.dispatcher
    }

    /// Dispatcher counters.
    pub async fn stats(&self) -> Result<DispatcherStats, ActorError> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.dispatcher
            .send_message(DispatcherMessage::GetStats { reply: tx.into() })
            .map_err(|e| ActorError::Actor(format!("Failed to send message: {}", e)))?;

        rx.await
            .map_err(|_| ActorError::Actor("Failed to receive response".to_string()))
    }

    /// Stop the dispatcher and its workers and wait for it to exit.
    ///
    /// Jobs still being worked on stay claimed and are released once the
    /// claims go stale.
    pub async fn stop(self) -> Result<(), ActorError> {
        self.dispatcher.stop(None);
        self.join
            .await
            .map_err(|e| ActorError::Actor(format!("Dispatcher task failed: {}", e)))?;
        tracing::info!("Engine {} stopped", self.owner);
        Ok(())
    }
}
