//! HTTP client for OpenAI-compatible upstreams
//!
//! Shared by configured pools and the passthrough surface. One
//! `reqwest::Client` is built at startup and cloned into every user.

use crate::dispatch::{ModelResponse, Operation};
use crate::error::{AppError, AppResult};
use serde_json::Value;
use std::time::Duration;

/// Upstream error bodies are truncated to this many characters in errors
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Create a client with a per-request timeout
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Full URL for an operation on an upstream base
    pub fn endpoint_url(api_base: &str, operation: Operation) -> String {
        format!(
            "{}{}",
            api_base.trim_end_matches('/'),
            operation.upstream_path()
        )
    }

    /// POST an operation body upstream and decode the reply
    ///
    /// JSON replies become [`ModelResponse::Json`]; anything else (audio from
    /// speech synthesis) is returned as [`ModelResponse::Binary`].
    ///
    /// # Errors
    /// - [`AppError::UpstreamRequest`] when the request cannot be sent or the
    ///   body cannot be read
    /// - [`AppError::Upstream`] for a non-2xx status
    pub async fn post(
        &self,
        api_base: &str,
        operation: Operation,
        api_key: Option<&str>,
        body: Value,
    ) -> AppResult<ModelResponse> {
        let endpoint = Self::endpoint_url(api_base, operation);

        tracing::debug!(
            endpoint = %endpoint,
            operation = %operation,
            "Sending upstream request"
        );

        let mut request = self.http.post(&endpoint).json(&body);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::UpstreamRequest {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::UpstreamRequest {
                endpoint: endpoint.clone(),
                reason: format!("failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            let body: String = String::from_utf8_lossy(&bytes)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            tracing::warn!(
                endpoint = %endpoint,
                status = status.as_u16(),
                "Upstream returned error status"
            );
            return Err(AppError::Upstream {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        if content_type.starts_with("application/json") {
            let value = serde_json::from_slice(&bytes).map_err(|e| AppError::UpstreamRequest {
                endpoint: endpoint.clone(),
                reason: format!("invalid JSON in response: {}", e),
            })?;
            Ok(ModelResponse::Json(value))
        } else {
            Ok(ModelResponse::Binary {
                content_type,
                bytes: bytes.to_vec(),
            })
        }
    }
}
