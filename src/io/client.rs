// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Transport to the generation backend.
//!
//! [`GenerationBackend`] is the seam the orchestrator talks to;
//! [`HttpBackend`] implements it over HTTP with reqwest.

use crate::io::api::{ConfigRequest, ConfigResponse, HealthResponse, ScreenRequest, ScreenResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_REQUEST_ATTEMPTS: usize = 1;

pub const CONFIG_PATH: &str = "/api/generate-config";
pub const SCREEN_PATH: &str = "/api/generate-screen-ui";
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("backend base url is missing")]
    BaseUrlMissing,
    #[error("request failed: {message}")]
    Request { message: String },
    #[error("failed to read response: {message}")]
    Read { message: String },
    #[error("backend returned HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("could not decode response: {message}")]
    Decode { message: String },
}

/// Operations the orchestrator needs from a backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate_config(&self, request: &ConfigRequest) -> Result<ConfigResponse, ClientError>;

    async fn generate_screen(&self, request: &ScreenRequest) -> Result<ScreenResponse, ClientError>;

    /// Reachability probe. Backends without one are assumed healthy.
    async fn health(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Attempts per request; only transport errors are retried.
    pub request_attempts: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            request_attempts: DEFAULT_REQUEST_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    timeout: Duration,
    request_attempts: usize,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            request_attempts: config.request_attempts.max(1),
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim().trim_start_matches('/'))
    }

    async fn post_json<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, ClientError>
    where
        Req: Serialize + ?Sized + Sync,
        Res: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let mut last_error: Option<String> = None;
        for attempt in 0..self.request_attempts {
            let request = self.http.post(url.as_str()).timeout(self.timeout).json(payload);
            match request.send().await {
                Ok(response) => return decode_json_response(response).await,
                Err(error) => {
                    log::warn!("POST {} failed (attempt {}): {}", url, attempt + 1, error);
                    last_error = Some(error.to_string());
                }
            }
        }
        Err(ClientError::Request {
            message: last_error.unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn get_json<Res>(&self, path: &str) -> Result<Res, ClientError>
    where
        Res: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self
            .http
            .get(url.as_str())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| ClientError::Request {
                message: error.to_string(),
            })?;
        decode_json_response(response).await
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn generate_config(&self, request: &ConfigRequest) -> Result<ConfigResponse, ClientError> {
        self.post_json(CONFIG_PATH, request).await
    }

    async fn generate_screen(&self, request: &ScreenRequest) -> Result<ScreenResponse, ClientError> {
        self.post_json(SCREEN_PATH, request).await
    }

    async fn health(&self) -> Result<(), ClientError> {
        let response: HealthResponse = self.get_json(HEALTH_PATH).await?;
        if response.status == "ok" {
            Ok(())
        } else {
            Err(ClientError::Decode {
                message: format!("unexpected health status {:?}", response.status),
            })
        }
    }
}

fn normalize_base_url(base_url: &str) -> Result<String, ClientError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ClientError::BaseUrlMissing);
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn format_http_error(status: StatusCode, body: &[u8]) -> ClientError {
    let body = String::from_utf8_lossy(body).trim().to_string();
    let body = if body.is_empty() { "<empty>".to_string() } else { body };
    ClientError::Http { status, body }
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let bytes = response.bytes().await.map_err(|error| ClientError::Read {
        message: error.to_string(),
    })?;
    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }
    serde_json::from_slice(&bytes).map_err(|error| ClientError::Decode {
        message: error.to_string(),
    })
}
