//! HTTP request handlers for the Modelgate API

use crate::access::HttpModelAccess;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::pool::{ConfiguredPoolFactory, DeploymentPool, PoolFactory};
use crate::upstream::UpstreamClient;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub mod health;
pub mod metrics;
pub mod openai;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    dispatcher: Arc<Dispatcher>,
    pool: Option<Arc<dyn DeploymentPool>>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState from configuration
    ///
    /// Builds the shared upstream client, the passthrough surface and, when
    /// `[pool]` is configured, the shared deployment pool.
    pub fn new(config: Config) -> AppResult<Self> {
        let upstream =
            UpstreamClient::new(Duration::from_secs(config.server.request_timeout_seconds))?;
        let metrics = Arc::new(
            Metrics::new()
                .map_err(|e| AppError::Internal(format!("Failed to create metrics: {}", e)))?,
        );

        let access = Arc::new(HttpModelAccess::new(upstream.clone(), &config.passthrough));
        let factory = Arc::new(ConfiguredPoolFactory::new(upstream));

        let pool: Option<Arc<dyn DeploymentPool>> = match &config.pool {
            Some(pool_config) => Some(Arc::from(factory.build(pool_config.clone())?)),
            None => None,
        };

        let dispatcher = Arc::new(Dispatcher::new(access, factory, metrics.clone()));

        Ok(Self::from_parts(config, dispatcher, pool, metrics))
    }

    /// Assemble state from pre-built components
    pub fn from_parts(
        config: Config,
        dispatcher: Arc<Dispatcher>,
        pool: Option<Arc<dyn DeploymentPool>>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
            pool,
            metrics,
        }
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the dispatcher
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Get the shared deployment pool, if one is configured
    pub fn pool(&self) -> Option<&dyn DeploymentPool> {
        self.pool.as_deref()
    }

    /// Fallback model for single-model mode
    pub fn single_model(&self) -> Option<&str> {
        self.config.routing.single_model.as_deref()
    }

    /// Get reference to the metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Build the application router with every endpoint and layer attached
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .route("/v1/models", get(openai::models::handler))
        .route("/v1/chat/completions", post(openai::chat_completions))
        .route("/v1/completions", post(openai::completions))
        .route("/v1/embeddings", post(openai::embeddings))
        .route("/v1/images/generations", post(openai::image_generations))
        .route("/v1/audio/speech", post(openai::speech))
        .route("/v1/audio/transcriptions", post(openai::transcriptions))
        .route("/v1/moderations", post(openai::moderations))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
