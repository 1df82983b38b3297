use axum::extract::Query;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use db::DbError;
use db::repositories::JobRepository;
use jobs_core::NewJob;
use serde::Deserialize;
use serde_json::json;

use crate::errors::{self, CREATE_FAILED, JOB_ENQUEUED};

pub fn router() -> Router {
    Router::new().route("/jobs", post(create_job).get(list_jobs))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
}

/// Accept a job for asynchronous processing.
pub async fn create_job(body: Result<Json<NewJob>, JsonRejection>) -> Response {
    let Json(new_job) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return errors::json_message(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    if let Err(e) = new_job.validate() {
        return errors::json_message(StatusCode::BAD_REQUEST, e.to_string());
    }

    match JobRepository::create(&new_job).await {
        Ok(job) => {
            tracing::debug!("Enqueued job {} ({})", job.id, job.action);
            (
                StatusCode::ACCEPTED,
                Json(json!({ "message": JOB_ENQUEUED, "id": job.id })),
            )
                .into_response()
        }
        Err(DbError::Validation(msg)) => errors::json_message(StatusCode::BAD_REQUEST, msg),
        Err(e) => {
            tracing::error!("Failed to create job: {}", e);
            errors::json_message(StatusCode::NOT_ACCEPTABLE, CREATE_FAILED)
        }
    }
}

/// List jobs, optionally filtered by status. An empty `status` means no filter.
pub async fn list_jobs(Query(query): Query<ListJobsQuery>) -> Response {
    let jobs = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(status) => JobRepository::list_by_status(status).await,
        None => JobRepository::list_all().await,
    };

    match jobs {
        Ok(jobs) => (StatusCode::OK, Json(json!({ "jobs": jobs }))).into_response(),
        Err(DbError::NotFound(_)) => errors::no_jobs_found(),
        Err(e) => {
            tracing::error!("Failed to list jobs: {}", e);
            errors::no_jobs_found()
        }
    }
}
