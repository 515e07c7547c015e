//! Request dispatch for Modelgate
//!
//! Decides which execution path serves a model request (the caller's own
//! credentials, an ephemeral pool, multi-model fan-out, the configured pool,
//! or the single-model passthrough) and invokes it.

pub mod dispatcher;
pub mod rules;

pub use dispatcher::Dispatcher;
pub use rules::{decide, split_model_list};

use crate::access::ModelAccess;
use crate::error::AppResult;
use crate::pool::{DeploymentPool, PoolRequest};
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Downstream capability requested by a call
///
/// The serialized names match the operation names reported in client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Operation {
    #[serde(rename = "acompletion")]
    Completion,
    #[serde(rename = "atext_completion")]
    TextCompletion,
    #[serde(rename = "aembedding")]
    Embedding,
    #[serde(rename = "aimage_generation")]
    ImageGeneration,
    #[serde(rename = "aspeech")]
    Speech,
    #[serde(rename = "atranscription")]
    Transcription,
    #[serde(rename = "amoderation")]
    Moderation,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::Completion,
        Operation::TextCompletion,
        Operation::Embedding,
        Operation::ImageGeneration,
        Operation::Speech,
        Operation::Transcription,
        Operation::Moderation,
    ];

    /// Operation name used in error details, logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completion => "acompletion",
            Self::TextCompletion => "atext_completion",
            Self::Embedding => "aembedding",
            Self::ImageGeneration => "aimage_generation",
            Self::Speech => "aspeech",
            Self::Transcription => "atranscription",
            Self::Moderation => "amoderation",
        }
    }

    /// OpenAI-compatible path appended to a deployment's `api_base`
    pub fn upstream_path(&self) -> &'static str {
        match self {
            Self::Completion => "/chat/completions",
            Self::TextCompletion => "/completions",
            Self::Embedding => "/embeddings",
            Self::ImageGeneration => "/images/generations",
            Self::Speech => "/audio/speech",
            Self::Transcription => "/audio/transcriptions",
            Self::Moderation => "/moderations",
        }
    }

    /// Invoke this operation on the generic model-access surface
    pub async fn invoke_access(
        self,
        access: &dyn ModelAccess,
        payload: RoutePayload,
    ) -> AppResult<ModelResponse> {
        match self {
            Self::Completion => access.completion(payload).await,
            Self::TextCompletion => access.text_completion(payload).await,
            Self::Embedding => access.embedding(payload).await,
            Self::ImageGeneration => access.image_generation(payload).await,
            Self::Speech => access.speech(payload).await,
            Self::Transcription => access.transcription(payload).await,
            Self::Moderation => access.moderation(payload).await,
        }
    }

    /// Invoke this operation on a deployment pool
    pub async fn invoke_pool(
        self,
        pool: &dyn DeploymentPool,
        request: PoolRequest,
    ) -> AppResult<ModelResponse> {
        match self {
            Self::Completion => pool.completion(request).await,
            Self::TextCompletion => pool.text_completion(request).await,
            Self::Embedding => pool.embedding(request).await,
            Self::ImageGeneration => pool.image_generation(request).await,
            Self::Speech => pool.speech(request).await,
            Self::Transcription => pool.transcription(request).await,
            Self::Moderation => pool.moderation(request).await,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound model request
///
/// The fields that steer dispatch are explicit; every other field the
/// client sent (messages, input, temperature, ...) is kept in `params`
/// and forwarded untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RoutePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Caller-supplied upstream credential; bypasses the pool entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Pool definition for a one-off ephemeral pool
    ///
    /// Kept as raw JSON; it is parsed into a [`PoolConfig`](crate::config::PoolConfig)
    /// only when the ephemeral pool strategy claims it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_config: Option<Value>,
    /// Race a comma-separated model list and keep the first answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_response: Option<bool>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl RoutePayload {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }

    /// Add a forwarded parameter
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Requested model, or the empty string when absent
    pub fn model_or_empty(&self) -> &str {
        self.model.as_deref().unwrap_or("")
    }

    pub fn wants_fastest_response(&self) -> bool {
        self.fastest_response.unwrap_or(false)
    }

    /// Build the JSON body sent upstream
    ///
    /// Only `params` and the model travel; credentials, pool definitions and
    /// dispatch flags stay on this side.
    pub fn into_upstream_body(self, model: Option<&str>) -> Value {
        let mut body = self.params;
        if let Some(model) = model.or(self.model.as_deref()) {
            body.insert("model".to_string(), Value::String(model.to_string()));
        }
        Value::Object(body)
    }
}

/// Result of a downstream operation
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Json(Value),
    /// Non-JSON upstream body, e.g. synthesized audio
    Binary {
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl ModelResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Binary { .. } => None,
        }
    }
}

impl IntoResponse for ModelResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Json(value) => (StatusCode::OK, Json(value)).into_response(),
            Self::Binary {
                content_type,
                bytes,
            } => {
                let content_type = HeaderValue::from_str(&content_type)
                    .unwrap_or(HeaderValue::from_static("application/octet-stream"));
                (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response()
            }
        }
    }
}

/// Routing strategy selected for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    /// Caller supplied `api_key`; generic surface with the full payload
    DirectCredential,
    /// Caller supplied `user_config`; one-off pool built from it
    EphemeralPool,
    /// Comma-separated models raced for the first answer
    FanOutFastest,
    /// Comma-separated models completed as a batch
    FanOutBatch,
    /// Registered model name or deployment id
    PoolModel,
    /// Model group alias, resolved inside the pool
    PoolAlias,
    /// Deployment-specific name; pool pinned to that deployment
    PoolSpecificDeployment,
    /// Unknown model with pass-through-all enabled; generic surface
    PassThroughAll,
    /// Unknown model handed to the pool's default deployments
    PoolDefault,
    /// No pool; fallback single model via the generic surface
    SingleModel,
}

impl RouteStrategy {
    /// Convert to string representation for logging and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectCredential => "direct_credential",
            Self::EphemeralPool => "ephemeral_pool",
            Self::FanOutFastest => "fan_out_fastest",
            Self::FanOutBatch => "fan_out_batch",
            Self::PoolModel => "pool_model",
            Self::PoolAlias => "pool_alias",
            Self::PoolSpecificDeployment => "pool_specific_deployment",
            Self::PassThroughAll => "pass_through_all",
            Self::PoolDefault => "pool_default",
            Self::SingleModel => "single_model",
        }
    }

    /// Whether this strategy runs against the caller-supplied pool
    pub fn uses_shared_pool(&self) -> bool {
        matches!(
            self,
            Self::FanOutFastest
                | Self::FanOutBatch
                | Self::PoolModel
                | Self::PoolAlias
                | Self::PoolSpecificDeployment
                | Self::PoolDefault
        )
    }
}
