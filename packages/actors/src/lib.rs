//! Actor system for processing jobs.
//!
//! This crate provides the Ractor-based polling engine that claims pending
//! jobs from the store and runs them on a pool of workers.
//!
//! # Architecture
//!
//! - `Engine` - Builds and starts a dispatcher, returns an `EngineHandle`
//! - `Dispatcher` - Ticks on the polling interval, claims a batch of jobs
//!   and hands them out round-robin
//! - `WorkerActor` - Applies a job's operation and writes the terminal status
//!
//! # Usage
//!
//! ```ignore
//! use actors::Engine;
//! use jobs_core::EngineConfig;
//!
//! let handle = Engine::surreal()
//!     .with_config(EngineConfig::default().with_workers(4))
//!     .start()
//!     .await?;
//!
//! let mut events = handle.subscribe();
//! // ...
//! handle.stop().await?;
//! ```

mod dispatcher;
mod engine;
mod messages;
mod store;
mod worker_actor;

pub use dispatcher::{Dispatcher, DispatcherArgs};
pub use engine::{Engine, EngineHandle};
pub use messages::{ActorError, DispatcherMessage, DispatcherStats, JobOutcome, WorkerMessage};
pub use store::{BoxFuture, ConfigStore, JobStore, StoreFuture, SurrealStore};
pub use worker_actor::{WorkerActor, WorkerArgs, execute_job};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
