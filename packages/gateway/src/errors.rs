//! Consistent JSON responses for the jobs API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub const JOB_ENQUEUED: &str = "job enqueued";
pub const CREATE_FAILED: &str = "it's not possible to create a job with your parameters";
pub const NO_JOBS_FOUND: &str = "no jobs found";

/// `{ "message": ... }` with the given status.
pub fn json_message(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

pub fn no_jobs_found() -> Response {
    json_message(StatusCode::NOT_FOUND, NO_JOBS_FOUND)
}
