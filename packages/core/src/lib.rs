//! Core domain types for the job processing system.
//!
//! This crate contains shared types used across all packages:
//! - Job, JobStatus and the lifecycle rules
//! - Operation, the registry of reductions a job can request
//! - EngineConfig for the worker engine
//! - Events published by the engine

mod config;
mod events;
mod job;
mod operation;

pub use config::{DEFAULT_POLLING_INTERVAL, EngineConfig, MIN_STALE_CLAIM_AFTER};
pub use events::JobEvent;
pub use job::{Job, JobId, JobKey, JobStatus, MAX_ACTION_LEN, NewJob, ValidationError};
pub use operation::{Operation, UnknownOperation};
