//! Per-client request rate limiting.
//!
//! Clients are keyed by IP: forwarding headers first, then the peer
//! address. Requests that carry neither share one bucket.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use tower_governor::GovernorError;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::{KeyExtractor, SmartIpKeyExtractor};

use crate::errors::json_message;

/// Requests per second allowed per client, also the burst size.
pub const DEFAULT_RATE_LIMIT: u32 = 1000;

pub const RATE_LIMIT_EXCEEDED: &str = "rate limit exceeded";

#[derive(Debug, Clone, Copy)]
struct ClientIp;

impl KeyExtractor for ClientIp {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(SmartIpKeyExtractor
            .extract(req)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)))
    }
}

fn rejected(error: GovernorError) -> Response {
    match error {
        GovernorError::TooManyRequests { headers, .. } => {
            let mut response = json_message(StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_EXCEEDED);
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
        GovernorError::Other { code, msg, .. } => {
            json_message(code, msg.unwrap_or_else(|| code.to_string()))
        }
        GovernorError::UnableToExtractKey => {
            json_message(StatusCode::FORBIDDEN, "error while extracting identifier")
        }
    }
}

/// Limit `router` to `per_second` requests per client. `0` disables the limit.
pub fn limit(router: Router, per_second: u32) -> Router {
    if per_second == 0 {
        return router;
    }

    let config = GovernorConfigBuilder::default()
        .period(Duration::from_secs(1) / per_second)
        .burst_size(per_second)
        .key_extractor(ClientIp)
        .error_handler(rejected)
        .finish();

    match config {
        Some(config) => router.layer(GovernorLayer {
            config: Arc::new(config),
        }),
        None => {
            tracing::warn!("Invalid rate limit {}/s, requests are not limited", per_second);
            router
        }
    }
}
