//! HTTP gateway for submitting and inspecting jobs.
//!
//! - `POST /jobs` stores a new `PENDING` job and answers `202 Accepted`
//! - `GET /jobs[?status=...]` lists stored jobs
//!
//! Handlers only touch the job store; processing happens in the engine.
//! Every route is rate limited per client IP.

pub mod errors;
pub mod jobs;
pub mod rate_limit;

use axum::Router;

pub use rate_limit::DEFAULT_RATE_LIMIT;

/// Build the gateway router with the default rate limit.
pub fn router() -> Router {
    router_with_rate_limit(DEFAULT_RATE_LIMIT)
}

/// Build the gateway router allowing `per_second` requests per client.
/// `0` turns the limit off.
pub fn router_with_rate_limit(per_second: u32) -> Router {
    rate_limit::limit(jobs::router(), per_second)
}
