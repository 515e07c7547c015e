//! Recording test doubles for the dispatcher's collaborators
//!
//! Each double answers with a small JSON object naming the surface and the
//! operation it served, and keeps every call for later inspection.

#![allow(dead_code)]

use async_trait::async_trait;
use modelgate::access::ModelAccess;
use modelgate::config::{DeploymentConfig, DeploymentParams, GeneralSettings, PoolConfig};
use modelgate::dispatch::{Dispatcher, ModelResponse, Operation, RoutePayload};
use modelgate::error::{AppError, AppResult};
use modelgate::metrics::Metrics;
use modelgate::pool::{DeploymentPool, PoolFactory, PoolRequest, PoolView};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// One call observed on a [`RecordingPool`]
#[derive(Debug, Clone, PartialEq)]
pub enum PoolCall {
    Operation {
        operation: Operation,
        request: PoolRequest,
    },
    Batch {
        models: Vec<String>,
        payload: RoutePayload,
    },
    Fastest {
        payload: RoutePayload,
    },
}

pub type PoolLog = Arc<Mutex<Vec<PoolCall>>>;

/// Generic surface double
#[derive(Default)]
pub struct RecordingAccess {
    calls: Mutex<Vec<(Operation, RoutePayload)>>,
    fail_with: Option<u16>,
}

impl RecordingAccess {
    /// A surface whose every call fails with an upstream error of `status`
    pub fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(Operation, RoutePayload)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: Operation, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.calls.lock().unwrap().push((operation, payload));
        if let Some(status) = self.fail_with {
            return Err(AppError::Upstream {
                endpoint: "http://access.test".to_string(),
                status,
                body: "access failure".to_string(),
            });
        }
        Ok(ModelResponse::Json(
            json!({"surface": "access", "operation": operation.as_str()}),
        ))
    }
}

#[async_trait]
impl ModelAccess for RecordingAccess {
    async fn completion(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.record(Operation::Completion, payload)
    }

    async fn text_completion(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.record(Operation::TextCompletion, payload)
    }

    async fn embedding(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.record(Operation::Embedding, payload)
    }

    async fn image_generation(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.record(Operation::ImageGeneration, payload)
    }

    async fn speech(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.record(Operation::Speech, payload)
    }

    async fn transcription(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.record(Operation::Transcription, payload)
    }

    async fn moderation(&self, payload: RoutePayload) -> AppResult<ModelResponse> {
        self.record(Operation::Moderation, payload)
    }
}

/// Pool double with configurable routing metadata
#[derive(Default)]
pub struct RecordingPool {
    pub model_names: HashSet<String>,
    pub model_ids: HashSet<String>,
    pub aliases: Option<HashMap<String, String>>,
    pub deployment_names: HashSet<String>,
    pub settings: GeneralSettings,
    pub default_deployment: Option<DeploymentParams>,
    pub provider_defaults: Vec<DeploymentConfig>,
    pub log: PoolLog,
}

impl RecordingPool {
    pub fn with_models(names: &[&str]) -> Self {
        Self {
            model_names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Mirror the metadata of a pool definition
    pub fn from_config(config: &PoolConfig, log: PoolLog) -> Self {
        Self {
            model_names: config
                .model_list
                .iter()
                .map(|d| d.model_name().to_string())
                .collect(),
            model_ids: config
                .model_list
                .iter()
                .filter_map(|d| d.id().map(str::to_string))
                .collect(),
            aliases: config.model_group_alias.clone(),
            deployment_names: config
                .model_list
                .iter()
                .map(|d| d.params().model().to_string())
                .collect(),
            settings: config.general_settings.clone(),
            default_deployment: config.default_deployment.clone(),
            provider_defaults: Vec::new(),
            log,
        }
    }

    pub fn calls(&self) -> Vec<PoolCall> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, operation: Operation, request: PoolRequest) -> AppResult<ModelResponse> {
        self.log.lock().unwrap().push(PoolCall::Operation { operation, request });
        Ok(ModelResponse::Json(
            json!({"surface": "pool", "operation": operation.as_str()}),
        ))
    }
}

impl PoolView for RecordingPool {
    fn model_names(&self) -> &HashSet<String> {
        &self.model_names
    }

    fn model_ids(&self) -> &HashSet<String> {
        &self.model_ids
    }

    fn model_group_alias(&self) -> Option<&HashMap<String, String>> {
        self.aliases.as_ref()
    }

    fn deployment_names(&self) -> &HashSet<String> {
        &self.deployment_names
    }

    fn general_settings(&self) -> &GeneralSettings {
        &self.settings
    }

    fn default_deployment(&self) -> Option<&DeploymentParams> {
        self.default_deployment.as_ref()
    }

    fn provider_default_deployments(&self) -> &[DeploymentConfig] {
        &self.provider_defaults
    }
}

#[async_trait]
impl DeploymentPool for RecordingPool {
    async fn completion(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.record(Operation::Completion, request)
    }

    async fn text_completion(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.record(Operation::TextCompletion, request)
    }

    async fn embedding(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.record(Operation::Embedding, request)
    }

    async fn image_generation(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.record(Operation::ImageGeneration, request)
    }

    async fn speech(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.record(Operation::Speech, request)
    }

    async fn transcription(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.record(Operation::Transcription, request)
    }

    async fn moderation(&self, request: PoolRequest) -> AppResult<ModelResponse> {
        self.record(Operation::Moderation, request)
    }

    async fn batch_completion(
        &self,
        models: Vec<String>,
        payload: RoutePayload,
    ) -> AppResult<ModelResponse> {
        let count = models.len();
        self.log
            .lock()
            .unwrap()
            .push(PoolCall::Batch { models, payload });
        Ok(ModelResponse::Json(
            json!({"surface": "pool", "operation": "batch_completion", "count": count}),
        ))
    }

    async fn batch_completion_fastest_response(
        &self,
        payload: RoutePayload,
    ) -> AppResult<ModelResponse> {
        self.log.lock().unwrap().push(PoolCall::Fastest { payload });
        Ok(ModelResponse::Json(
            json!({"surface": "pool", "operation": "batch_completion_fastest_response"}),
        ))
    }
}

/// Factory double: records each config and builds a [`RecordingPool`]
/// mirroring it, sharing one call log across every pool it builds
#[derive(Default)]
pub struct RecordingFactory {
    configs: Mutex<Vec<PoolConfig>>,
    pub log: PoolLog,
    fail: bool,
}

impl RecordingFactory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn configs(&self) -> Vec<PoolConfig> {
        self.configs.lock().unwrap().clone()
    }

    pub fn pool_calls(&self) -> Vec<PoolCall> {
        self.log.lock().unwrap().clone()
    }
}

impl PoolFactory for RecordingFactory {
    fn build(&self, config: PoolConfig) -> AppResult<Box<dyn DeploymentPool>> {
        self.configs.lock().unwrap().push(config.clone());
        if self.fail {
            return Err(AppError::Config("user_config rejected".to_string()));
        }
        Ok(Box::new(RecordingPool::from_config(
            &config,
            self.log.clone(),
        )))
    }
}

/// Dispatcher wired to recording doubles
pub struct Harness {
    pub access: Arc<RecordingAccess>,
    pub factory: Arc<RecordingFactory>,
    pub metrics: Arc<Metrics>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_parts(RecordingAccess::default(), RecordingFactory::default())
    }

    pub fn with_parts(access: RecordingAccess, factory: RecordingFactory) -> Self {
        let access = Arc::new(access);
        let factory = Arc::new(factory);
        let metrics = Arc::new(Metrics::new().expect("metrics should build"));
        let dispatcher = Dispatcher::new(access.clone(), factory.clone(), metrics.clone());
        Self {
            access,
            factory,
            metrics,
            dispatcher,
        }
    }
}

/// A minimal valid pool definition
pub fn pool_config(model_name: &str, model: &str) -> PoolConfig {
    PoolConfig {
        model_list: vec![DeploymentConfig::new(
            model_name,
            DeploymentParams::new(model, "http://localhost:1/v1"),
        )],
        ..PoolConfig::default()
    }
}

/// [`pool_config`] as the raw JSON a request carries in `user_config`
pub fn user_config(model_name: &str, model: &str) -> serde_json::Value {
    serde_json::to_value(pool_config(model_name, model)).expect("pool config should serialize")
}
