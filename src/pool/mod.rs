//! Deployment pools
//!
//! A pool is a set of backend deployments grouped under caller-facing model
//! names. The dispatcher reads a pool's metadata through [`PoolView`] and
//! invokes operations through [`DeploymentPool`].

pub mod configured;

pub use configured::{ConfiguredPool, ConfiguredPoolFactory};

use crate::config::{DeploymentConfig, DeploymentParams, GeneralSettings, PoolConfig};
use crate::dispatch::{ModelResponse, RoutePayload};
use crate::error::AppResult;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Read-only routing metadata of a pool
pub trait PoolView {
    /// Registered model group names
    fn model_names(&self) -> &HashSet<String>;

    /// Identifiers of every deployment in the pool
    fn model_ids(&self) -> &HashSet<String>;

    /// Alias → model group mapping, if the pool defines one
    fn model_group_alias(&self) -> Option<&HashMap<String, String>>;

    /// Deployment-specific names
    fn deployment_names(&self) -> &HashSet<String>;

    fn general_settings(&self) -> &GeneralSettings;

    fn default_deployment(&self) -> Option<&DeploymentParams>;

    /// `<provider>/*` entries that accept any model of that provider
    fn provider_default_deployments(&self) -> &[DeploymentConfig];
}

/// Arguments for a single-operation pool call
#[derive(Debug, Clone, PartialEq)]
pub struct PoolRequest {
    pub payload: RoutePayload,
    /// Route to the deployment whose deployment-specific name equals `model`
    pub specific_deployment: bool,
}

impl PoolRequest {
    pub fn new(payload: RoutePayload) -> Self {
        Self {
            payload,
            specific_deployment: false,
        }
    }

    pub fn specific_deployment(payload: RoutePayload) -> Self {
        Self {
            payload,
            specific_deployment: true,
        }
    }
}

/// A pool of deployments able to serve every operation kind
///
/// Implementations must be safe for concurrent use through `&self`.
#[async_trait]
pub trait DeploymentPool: PoolView + Send + Sync {
    async fn completion(&self, request: PoolRequest) -> AppResult<ModelResponse>;

    async fn text_completion(&self, request: PoolRequest) -> AppResult<ModelResponse>;

    async fn embedding(&self, request: PoolRequest) -> AppResult<ModelResponse>;

    async fn image_generation(&self, request: PoolRequest) -> AppResult<ModelResponse>;

    async fn speech(&self, request: PoolRequest) -> AppResult<ModelResponse>;

    async fn transcription(&self, request: PoolRequest) -> AppResult<ModelResponse>;

    async fn moderation(&self, request: PoolRequest) -> AppResult<ModelResponse>;

    /// Run one completion per model in `models` and collect every result
    ///
    /// `payload.model` is unset; each call uses one entry of `models`.
    async fn batch_completion(
        &self,
        models: Vec<String>,
        payload: RoutePayload,
    ) -> AppResult<ModelResponse>;

    /// Race the comma-separated models in `payload.model` and return the first success
    async fn batch_completion_fastest_response(
        &self,
        payload: RoutePayload,
    ) -> AppResult<ModelResponse>;
}

/// Builds pools from a configuration object
///
/// Used for request-supplied `user_config` pools, which live for a single call.
pub trait PoolFactory: Send + Sync {
    fn build(&self, config: PoolConfig) -> AppResult<Box<dyn DeploymentPool>>;
}
