//! Config-driven deployment pool
//!
//! Serves each operation from the first deployment that matches the
//! requested model. Deployment health, weighting and retries are not
//! handled here.

use super::{DeploymentPool, PoolFactory, PoolRequest, PoolView};
use crate::config::{DeploymentConfig, DeploymentParams, GeneralSettings, PoolConfig};
use crate::dispatch::{ModelResponse, Operation, RoutePayload, split_model_list};
use crate::error::{AppError, AppResult};
use crate::upstream::UpstreamClient;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{join_all, select_ok};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// A model list entry with its resolved id
#[derive(Debug, Clone)]
struct Deployment {
    id: String,
    config: DeploymentConfig,
}

impl Deployment {
    fn target(&self) -> Target<'_> {
        let params = self.config.params();
        Target {
            params,
            upstream_model: params.upstream_model().unwrap_or(params.model()).to_string(),
        }
    }
}

/// Where a request ends up after resolution
#[derive(Debug)]
struct Target<'a> {
    params: &'a DeploymentParams,
    upstream_model: String,
}

/// Deployment pool built from a [`PoolConfig`]
#[derive(Debug)]
pub struct ConfiguredPool {
    deployments: Vec<Deployment>,
    model_names: HashSet<String>,
    model_ids: HashSet<String>,
    deployment_names: HashSet<String>,
    model_group_alias: Option<HashMap<String, String>>,
    general_settings: GeneralSettings,
    default_deployment: Option<DeploymentParams>,
    provider_defaults: Vec<DeploymentConfig>,
    upstream: UpstreamClient,
}

impl ConfiguredPool {
    /// Build a pool from validated configuration
    ///
    /// Entries without an explicit `id` get a random one.
    ///
    /// # Errors
    /// Returns the validation error if `config` is invalid.
    pub fn new(config: PoolConfig, upstream: UpstreamClient) -> AppResult<Self> {
        config.validate()?;

        let PoolConfig {
            model_list,
            model_group_alias,
            general_settings,
            default_deployment,
        } = config;

        let deployments: Vec<Deployment> = model_list
            .into_iter()
            .map(|config| Deployment {
                id: config
                    .id()
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                config,
            })
            .collect();

        let model_names = deployments
            .iter()
            .map(|d| d.config.model_name().to_string())
            .collect();
        let model_ids = deployments.iter().map(|d| d.id.clone()).collect();
        let deployment_names = deployments
            .iter()
            .map(|d| d.config.params().model().to_string())
            .collect();
        let provider_defaults = deployments
            .iter()
            .filter(|d| d.config.provider_wildcard().is_some())
            .map(|d| d.config.clone())
            .collect();

        tracing::debug!(
            deployments = deployments.len(),
            has_default = default_deployment.is_some(),
            pass_through_all = general_settings.pass_through_all_models,
            "Built deployment pool"
        );

        Ok(Self {
            deployments,
            model_names,
            model_ids,
            deployment_names,
            model_group_alias,
            general_settings,
            default_deployment,
            provider_defaults,
            upstream,
        })
    }

    /// Resolve the deployment that serves `requested`
    ///
    /// # Resolution Order
    /// 1. `specific_deployment`: the entry whose deployment name is `requested`
    /// 2. deployment id
    /// 3. first entry of the model group
    /// 4. alias → first entry of the aliased group
    /// 5. `<provider>/*` entry matching the requested provider prefix
    /// 6. the default deployment
    fn resolve(&self, requested: &str, specific_deployment: bool) -> AppResult<Target<'_>> {
        if specific_deployment {
            return self
                .deployments
                .iter()
                .find(|d| d.config.params().model() == requested)
                .map(Deployment::target)
                .ok_or_else(|| AppError::NoDeployment {
                    model: requested.to_string(),
                });
        }

        if let Some(found) = self.deployments.iter().find(|d| d.id == requested) {
            return Ok(found.target());
        }

        if let Some(found) = self.first_in_group(requested) {
            return Ok(found.target());
        }

        if let Some(found) = self
            .model_group_alias
            .as_ref()
            .and_then(|aliases| aliases.get(requested))
            .and_then(|group| self.first_in_group(group))
        {
            return Ok(found.target());
        }

        if let Some((provider, model)) = requested.split_once('/')
            && let Some(found) = self
                .provider_defaults
                .iter()
                .find(|d| d.provider_wildcard() == Some(provider))
        {
            return Ok(Target {
                params: found.params(),
                upstream_model: model.to_string(),
            });
        }

        if let Some(default) = &self.default_deployment {
            return Ok(Target {
                params: default,
                upstream_model: default.upstream_model().unwrap_or(requested).to_string(),
            });
        }

        Err(AppError::NoDeployment {
            model: requested.to_string(),
        })
    }

    fn first_in_group(&self, group: &str) -> Option<&Deployment> {
        self.deployments
            .iter()
            .find(|d| d.config.model_name() == group)
    }

    async fn call(&self, operation: Operation, request: PoolRequest) -> AppResult<ModelResponse> {
        let PoolRequest {
            payload,
            specific_deployment,
        } = request;

        let requested = payload.model_or_empty().to_string();
        let target = self.resolve(&requested, specific_deployment)?;

        tracing::debug!(
            operation = %operation,
            requested_model = %requested,
            upstream_model = %target.upstream_model,
            api_base = %target.params.api_base(),
            specific_deployment,
            "Resolved pool deployment"
        );

        let body = payload.into_upstream_body(Some(target.upstream_model.as_str()));
        self.upstream
            .post(
                target.params.api_base(),
                operation,
                target.params.api_key(),
                body,
            )
            .await
    }
}

impl PoolView for ConfiguredPool {
    fn model_names(&self) -> &HashSet<String> {
        &self.model_names
    }

    fn model_ids(&self) -> &HashSet<String> {
        &self.model_ids
    }

    fn model_group_alias(&self) -> Option<&HashMap<String, String>> {
        self.model_group_alias.as_ref()
    }

    fn deployment_names(&self) -> &HashSet<String> {
        &self.deployment_names
    }

    fn general_settings(&self) -> &GeneralSettings {
        &self.general_settings
    }

    fn default_deployment(&self) -> Option<&DeploymentParams> {
        self.default_deployment.as_ref()
    }

    fn provider_default_deployments(&self) -> &[DeploymentConfig] {
        &self.provider_defaults
    }
}

#[async_trait]
impl DeploymentPool for ConfiguredPool {
    async fn completion(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.call(Operation::Completion, request).await
    }

    async fn text_completion(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.call(Operation::TextCompletion, request).await
    }

    async fn embedding(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.call(Operation::Embedding, request).await
    }

    async fn image_generation(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.call(Operation::ImageGeneration, request).await
    }

    async fn speech(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.call(Operation::Speech, request).await
    }

    async fn transcription(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.call(Operation::Transcription, request).await
    }

    async fn moderation(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.call(Operation::Moderation, request).await
    }

    async fn batch_completion(
        &self,
        models: Vec<String>,
        payload: RoutePayload,
    ) -> AppResult<ModelResponse> {
        let calls = models.into_iter().map(|model| {
            let payload = RoutePayload {
                model: Some(model),
                ..payload.clone()
            };
            self.call(Operation::Completion, PoolRequest::new(payload))
        });

        // Failed models are reported in place so the caller sees every answer.
        let results = join_all(calls)
            .await
            .into_iter()
            .map(|result| match result {
                Ok(ModelResponse::Json(value)) => value,
                Ok(ModelResponse::Binary { content_type, .. }) => json!({
                    "error": format!("unexpected non-JSON completion ({})", content_type)
                }),
                Err(e) => json!({ "error": e.to_string() }),
            })
            .collect();

        Ok(ModelResponse::Json(Value::Array(results)))
    }

    async fn batch_completion_fastest_response(
        &self,
        payload: RoutePayload,
    ) -> AppResult<ModelResponse> {
        let models = split_model_list(payload.model_or_empty());

        let calls: Vec<_> = models
            .into_iter()
            .map(|model| {
                let payload = RoutePayload {
                    model: Some(model),
                    ..payload.clone()
                };
                self.call(Operation::Completion, PoolRequest::new(payload))
                    .boxed()
            })
            .collect();

        let (response, _pending) = select_ok(calls).await?;
        Ok(response)
    }
}

/// Factory for pools backed by a shared [`UpstreamClient`]
#[derive(Debug, Clone)]
pub struct ConfiguredPoolFactory {
    upstream: UpstreamClient,
}

impl ConfiguredPoolFactory {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }
}

impl PoolFactory for ConfiguredPoolFactory {
    fn build(&self, config: PoolConfig) -> AppResult<Box<dyn DeploymentPool>> {
        let pool = ConfiguredPool::new(config, self.upstream.clone())?;
        Ok(Box::new(pool))
    }
}
