//! HTTP plumbing shared by the REST-backed connectors

use crate::secrets::SecretManager;
use reqwest::{RequestBuilder, StatusCode};
use sdk::types::{ConnectorFailure, FailureKind};
use serde_json::Value;

/// Longest slice of an error body echoed into a failure reason
const MAX_BODY_EXCERPT: usize = 200;

/// Shared client; per-call deadlines are applied by the registry
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("scout/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub fn failure(kind: FailureKind, reason: impl Into<String>) -> ConnectorFailure {
    ConnectorFailure {
        kind,
        reason: reason.into(),
    }
}

/// Map a non-2xx status to a failure kind
pub fn classify_status(status: StatusCode) -> FailureKind {
    match status.as_u16() {
        401 | 403 => FailureKind::MissingCredential,
        404 => FailureKind::NotFound,
        429 => FailureKind::RateLimited,
        408 | 504 => FailureKind::Timeout,
        _ => FailureKind::BadResponse,
    }
}

fn excerpt(body: &str) -> String {
    let scrubbed = SecretManager::scrub(body);
    scrubbed.chars().take(MAX_BODY_EXCERPT).collect()
}

/// Send a request and decode a JSON body, classifying every failure
pub async fn send_json(service: &str, request: RequestBuilder) -> Result<Value, ConnectorFailure> {
    let response = request.send().await.map_err(|e| {
        let reason = SecretManager::scrub(&e.to_string());
        if e.is_timeout() {
            failure(FailureKind::Timeout, format!("{} request timed out", service))
        } else {
            failure(FailureKind::Network, format!("{} request failed: {}", service, reason))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(failure(
            classify_status(status),
            format!("{} HTTP {}: {}", service, status.as_u16(), excerpt(&body)),
        ));
    }

    response.json::<Value>().await.map_err(|e| {
        failure(
            FailureKind::BadResponse,
            format!("{} returned an undecodable body: {}", service, e),
        )
    })
}
