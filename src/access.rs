//! Generic model-access surface
//!
//! Serves requests that bypass the deployment pool: calls carrying their own
//! `api_key`, pools with pass-through-all enabled, and single-model mode.
//! The surface is injected into the dispatcher so tests can substitute it.

use crate::config::PassthroughConfig;
use crate::dispatch::{ModelResponse, Operation, RoutePayload};
use crate::error::{AppError, AppResult};
use crate::upstream::UpstreamClient;
use async_trait::async_trait;
use serde_json::Value;

/// One method per operation kind, each taking the full request payload
#[async_trait]
pub trait ModelAccess: Send + Sync {
    async fn completion(&self, payload: RoutePayload) -> AppResult<ModelResponse>;

    async fn text_completion(&self, payload: RoutePayload) -> AppResult<ModelResponse>;

    async fn embedding(&self, payload: RoutePayload) -> AppResult<ModelResponse>;

    async fn image_generation(&self, payload: RoutePayload) -> AppResult<ModelResponse>;

    async fn speech(&self, payload: RoutePayload) -> AppResult<ModelResponse>;

    async fn transcription(&self, payload: RoutePayload) -> AppResult<ModelResponse>;

    async fn moderation(&self, payload: RoutePayload) -> AppResult<ModelResponse>;
}

/// [`ModelAccess`] over an OpenAI-compatible HTTP upstream
///
/// A request's own `api_base` parameter and `api_key` take precedence over
/// the configured passthrough values. The configured `api_key` is attached
/// only when the request targets the configured `api_base`; while a key is
/// configured, a request that names another base must bring its own key.
#[derive(Debug, Clone)]
pub struct HttpModelAccess {
    upstream: UpstreamClient,
    api_base: Option<String>,
    api_key: Option<String>,
}

impl HttpModelAccess {
    pub fn new(upstream: UpstreamClient, config: &PassthroughConfig) -> Self {
        Self {
            upstream,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn is_configured_base(&self, api_base: &str) -> bool {
        self.api_base.as_deref().is_some_and(|configured| {
            configured.trim_end_matches('/') == api_base.trim_end_matches('/')
        })
    }

    async fn forward(
        &self,
        operation: Operation,
        mut payload: RoutePayload,
    ) -> AppResult<ModelResponse> {
        let api_base = match payload.params.remove("api_base") {
            Some(Value::String(base)) => base,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "api_base must be a string, got {}",
                    other
                )));
            }
            None => self.api_base.clone().ok_or_else(|| {
                AppError::Validation(format!(
                    "{}: no api_base in request and no passthrough api_base configured",
                    operation
                ))
            })?,
        };

        let api_key = match payload.api_key.take() {
            Some(key) => Some(key),
            None if self.api_key.is_none() => None,
            None if self.is_configured_base(&api_base) => self.api_key.clone(),
            // The configured key is only ever sent to the configured base.
            None => {
                return Err(AppError::Validation(format!(
                    "{}: a request that overrides api_base must supply its own api_key",
                    operation
                )));
            }
        };

        tracing::debug!(
            operation = %operation,
            model = payload.model_or_empty(),
            api_base = %api_base,
            caller_credential = api_key.is_some(),
            "Forwarding request through passthrough surface"
        );

        let body = payload.into_upstream_body(None);
        self.upstream
            .post(&api_base, operation, api_key.as_deref(), body)
            .await
    }
}

#[async_trait]
impl ModelAccess for HttpModelAccess {
    async fn completion(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.forward(Operation::Completion, payload).await
    }

    async fn text_completion(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.forward(Operation::TextCompletion, payload).await
    }

    async fn embedding(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.forward(Operation::Embedding, payload).await
    }

    async fn image_generation(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.forward(Operation::ImageGeneration, payload).await
    }

    async fn speech(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.forward(Operation::Speech, payload).await
    }

    async fn transcription(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.forward(Operation::Transcription, payload).await
    }

    async fn moderation(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.forward(Operation::Moderation, payload).await
    }
}
