#![allow(clippy::disallowed_methods)]

use std::error::Error;
use std::time::{Duration, Instant};

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use actors::Engine;
use db::DbConfig;
use db::repositories::{ConfigRepository, JobRepository};
use jobs_core::{JobId, JobStatus};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(request: Request<Body>) -> Result<(StatusCode, Value), Box<dyn Error>> {
    let response = gateway::router().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn post_jobs(body: impl Into<Body>) -> Request<Body> {
    Request::post("/jobs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get_jobs(query: &str) -> Request<Body> {
    Request::get(format!("/jobs{}", query))
        .body(Body::empty())
        .unwrap()
}

async fn create_and_list() -> Result<(), Box<dyn Error>> {
    let (status, body) = send(get_jobs("")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "jobs": [] }));

    let (status, body) = send(post_jobs(
        json!({ "data": [1, 2, 3], "action": "sum" }).to_string(),
    ))
    .await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "job enqueued");
    let id = JobId::parse(body["id"].as_str().unwrap_or_default())?;

    let stored = JobRepository::get(id).await?;
    assert_eq!(stored.status, JobStatus::Pending);
    assert_eq!(stored.result, 0);
    assert_eq!(stored.data, vec![1, 2, 3]);

    // Unknown actions are accepted and fail later in the engine.
    let (status, _) = send(post_jobs(
        json!({ "data": [], "action": "mul" }).to_string(),
    ))
    .await?;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = send(get_jobs("")).await?;
    assert_eq!(status, StatusCode::OK);
    let jobs = body["jobs"].as_array().cloned().unwrap_or_default();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"], id.to_string());
    assert_eq!(jobs[0]["status"], "PENDING");
    assert_eq!(jobs[0]["data"], json!([1, 2, 3]));
    assert_eq!(jobs[0]["action"], "sum");
    assert_eq!(jobs[0]["result"], 0);
    assert!(jobs[0].get("createdAt").is_some());

    let (status, body) = send(get_jobs("?status=pending")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs"].as_array().map(Vec::len), Some(2));

    Ok(())
}

async fn status_filters() -> Result<(), Box<dyn Error>> {
    let (status, body) = send(get_jobs("?status=PROCESSED")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "no jobs found" }));

    let (status, body) = send(get_jobs("?status=finished")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "no jobs found");

    // A terminal job shows up under its status.
    let job = JobRepository::create(&jobs_core::NewJob::new("sub", vec![5, 5])).await?;
    let claimed = JobRepository::claim_pending_batch("gateway-test", 10).await?;
    assert_eq!(claimed.len(), 1);
    JobRepository::update_job(&claimed[0].key, "gateway-test", JobStatus::Processed, -10).await?;

    let (status, body) = send(get_jobs("?status=processed")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs"][0]["id"], job.id.to_string());
    assert_eq!(body["jobs"][0]["result"], -10);

    let (status, _) = send(get_jobs("?status=PENDING")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // An empty status is no filter at all.
    let (status, body) = send(get_jobs("?status=")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs"].as_array().map(Vec::len), Some(1));

    Ok(())
}

async fn actions_are_stored_verbatim() -> Result<(), Box<dyn Error>> {
    let (status, body) = send(post_jobs(
        json!({ "data": [1], "action": " sum " }).to_string(),
    ))
    .await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = JobId::parse(body["id"].as_str().unwrap_or_default())?;

    let (_, body) = send(get_jobs("")).await?;
    assert_eq!(body["jobs"][0]["id"], id.to_string());
    assert_eq!(body["jobs"][0]["action"], " sum ");

    Ok(())
}

fn get_jobs_from(client: &str) -> Request<Body> {
    Request::get("/jobs")
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

async fn requests_over_the_limit_are_rejected() -> Result<(), Box<dyn Error>> {
    let app = gateway::router_with_rate_limit(2);

    for _ in 0..2 {
        let response = app.clone().oneshot(get_jobs_from("10.0.0.1")).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(get_jobs_from("10.0.0.1")).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body, json!({ "message": "rate limit exceeded" }));

    // Other clients have their own budget.
    let response = app.clone().oneshot(get_jobs_from("10.0.0.2")).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // A zero limit turns limiting off.
    let app = gateway::router_with_rate_limit(0);
    for _ in 0..5 {
        let response = app.clone().oneshot(get_jobs_from("10.0.0.1")).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    Ok(())
}

async fn bad_requests() -> Result<(), Box<dyn Error>> {
    let (status, body) = send(post_jobs("{ not json")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, _) = send(post_jobs(json!({ "data": "x", "action": "sum" }).to_string())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(post_jobs(json!({ "data": [1], "action": "  " }).to_string())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "action must not be empty");

    let long = "x".repeat(65);
    let (status, _) = send(post_jobs(json!({ "data": [1], "action": long }).to_string())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was stored.
    assert!(JobRepository::list_all().await?.is_empty());

    Ok(())
}

async fn has_open_jobs() -> Result<bool, Box<dyn Error>> {
    for status in ["pending", "claimed"] {
        let (code, _) = send(get_jobs(&format!("?status={}", status))).await?;
        if code == StatusCode::OK {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn submitted_jobs_are_processed() -> Result<(), Box<dyn Error>> {
    ConfigRepository::set_polling_interval(20).await?;

    let requests = [
        json!({ "data": [1, 2, 3], "action": "sum" }),
        json!({ "data": [5, 1, 1], "action": "sub" }),
        json!({ "data": [1], "action": "multiply" }),
    ];
    for request in requests {
        let (status, _) = send(post_jobs(request.to_string())).await?;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let engine = Engine::surreal().start().await?;

    let deadline = Instant::now() + Duration::from_secs(10);
    while has_open_jobs().await? {
        assert!(Instant::now() < deadline, "jobs were not processed in time");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let (status, body) = send(get_jobs("?status=processed")).await?;
    assert_eq!(status, StatusCode::OK);
    let mut results: Vec<(String, i64)> = body["jobs"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|j| {
            let action = j["action"].as_str().unwrap_or_default().to_string();
            (action, j["result"].as_i64().unwrap_or_default())
        })
        .collect();
    results.sort();
    assert_eq!(results, vec![("sub".to_string(), -7), ("sum".to_string(), 6)]);

    let (status, body) = send(get_jobs("?status=ERROR")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs"][0]["action"], "multiply");
    assert_eq!(body["jobs"][0]["result"], 0);

    engine.stop().await?;

    Ok(())
}

// A single test per binary: the global connection is bound to the runtime
// that first opened it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_gateway() -> Result<(), Box<dyn Error>> {
    db::init(DbConfig::memory()).await?;

    create_and_list().await?;

    db::get_db()?.query("DELETE job;").await?;
    status_filters().await?;

    db::get_db()?.query("DELETE job;").await?;
    bad_requests().await?;

    db::get_db()?.query("DELETE job;").await?;
    actions_are_stored_verbatim().await?;

    requests_over_the_limit_are_rejected().await?;

    db::get_db()?.query("DELETE job;").await?;
    submitted_jobs_are_processed().await?;

    Ok(())
}
