// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the master API.
//!
//! 5xx responses and transport errors are transient: they retry with the
//! shared exponential backoff, bounded to a handful of attempts. 4xx
//! responses surface immediately to the caller.

use recode_core::job::{Job, JobId};
use recode_core::retry::RetryPolicy;
use recode_core::worker::WorkerId;
use recode_wire::{
    HeartbeatReply, HeartbeatRequest, RegisterNodeRequest, RegisterNodeResponse,
    SubmitResultRequest,
};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Client-side retry bound (attempts, not retries).
const MAX_ATTEMPTS: u32 = 4;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or 5xx after every retry.
    #[error("master unreachable after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },
    /// 4xx from the master; retrying would not help.
    #[error("master rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("unexpected response body: {0}")]
    Body(String),
}

/// Typed calls against the master, carrying auth and tenant headers.
#[derive(Clone)]
pub struct MasterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    tenant: String,
    retry: RetryPolicy,
}

impl MasterClient {
    pub fn new(base_url: &str, api_key: &str, tenant: &str) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                // Self-signed certificates are expected in development.
                .danger_accept_invalid_certs(true)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            tenant: tenant.to_string(),
            retry: RetryPolicy {
                max_retries: MAX_ATTEMPTS,
                base_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(8),
            },
        }
    }

    pub async fn register(
        &self,
        request: &RegisterNodeRequest,
    ) -> Result<RegisterNodeResponse, ClientError> {
        let body = self
            .send(reqwest::Method::POST, "/nodes/register", Some(serde_json::json!(request)))
            .await?;
        serde_json::from_value(body).map_err(|e| ClientError::Body(e.to_string()))
    }

    pub async fn heartbeat(
        &self,
        worker_id: &WorkerId,
        request: &HeartbeatRequest,
    ) -> Result<HeartbeatReply, ClientError> {
        let path = format!("/nodes/{}/heartbeat", worker_id);
        let body = self
            .send(reqwest::Method::POST, &path, Some(serde_json::json!(request)))
            .await?;
        if body.is_null() {
            return Ok(HeartbeatReply::default());
        }
        serde_json::from_value(body).map_err(|e| ClientError::Body(e.to_string()))
    }

    /// Poll for the next job. `None` mirrors the master's 204.
    pub async fn next_job(&self, worker_id: &WorkerId) -> Result<Option<Job>, ClientError> {
        let path = format!("/jobs/next?node_id={}", worker_id);
        let body = self.send(reqwest::Method::GET, &path, None).await?;
        if body.is_null() {
            return Ok(None);
        }
        serde_json::from_value(body).map(Some).map_err(|e| ClientError::Body(e.to_string()))
    }

    pub async fn submit_result(&self, request: &SubmitResultRequest) -> Result<(), ClientError> {
        self.send(reqwest::Method::POST, "/results", Some(serde_json::json!(request)))
            .await
            .map(|_| ())
    }

    pub async fn update_job_heartbeat(&self, job_id: &JobId) -> Result<(), ClientError> {
        let path = format!("/jobs/{}/heartbeat", job_id);
        self.send(reqwest::Method::POST, &path, None).await.map(|_| ())
    }

    pub async fn deregister(&self, worker_id: &WorkerId) -> Result<(), ClientError> {
        let path = format!("/nodes/{}", worker_id);
        self.send(reqwest::Method::DELETE, &path, None).await.map(|_| ())
    }

    /// One request with the shared retry envelope. Returns the JSON body,
    /// or `Value::Null` for bodyless 2xx responses.
    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(self.retry.delay(attempt - 1)).await;
            }

            let mut request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&self.api_key)
                .header("X-Tenant-ID", &self.tenant);
            if let Some(body) = &body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = format!("network error: {}", e);
                    tracing::warn!(url = %url, attempt, error = %e, "request failed, will retry");
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                if status == StatusCode::NO_CONTENT {
                    return Ok(serde_json::Value::Null);
                }
                let text = response.text().await.unwrap_or_default();
                if text.is_empty() {
                    return Ok(serde_json::Value::Null);
                }
                return serde_json::from_str(&text).map_err(|e| ClientError::Body(e.to_string()));
            }

            let message = response.text().await.unwrap_or_default();
            if status.is_client_error() {
                return Err(ClientError::Rejected { status, message });
            }
            last_error = format!("{}: {}", status, message);
            tracing::warn!(url = %url, attempt, status = %status, "server error, will retry");
        }

        Err(ClientError::Transient { attempts: MAX_ATTEMPTS, message: last_error })
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
