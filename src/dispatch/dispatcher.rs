//! Request dispatcher
//!
//! Runs the strategy chosen by [`decide`](super::rules::decide) against the
//! generic model-access surface, an ephemeral pool, or the shared pool.

use super::rules::{decide, split_model_list};
use super::{ModelResponse, Operation, RoutePayload, RouteStrategy};
use crate::access::ModelAccess;
use crate::config::PoolConfig;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::pool::{DeploymentPool, PoolFactory, PoolRequest};
use std::sync::Arc;
use std::time::Instant;

/// Dispatches model requests to exactly one downstream operation
///
/// Holds no per-request state; a single instance serves concurrent calls.
#[derive(Clone)]
pub struct Dispatcher {
    access: Arc<dyn ModelAccess>,
    factory: Arc<dyn PoolFactory>,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(
        access: Arc<dyn ModelAccess>,
        factory: Arc<dyn PoolFactory>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            access,
            factory,
            metrics,
        }
    }

    /// Route a request and await the selected downstream operation
    ///
    /// # Arguments
    /// * `payload` - The request; `user_config` and (for batch fan-out) `model`
    ///   are consumed by the strategy that claims them
    /// * `pool` - Shared deployment pool, if one is configured
    /// * `fallback_model` - Single model served when no pool is configured
    /// * `operation` - Which capability to invoke
    ///
    /// # Errors
    /// [`AppError::RoutingUnresolved`] when no rule matches. A `user_config`
    /// that does not parse as a pool definition fails with
    /// [`AppError::Config`]. Errors from the pool, the access surface or
    /// ephemeral pool construction are returned unchanged.
    pub async fn route(
        &self,
        payload: RoutePayload,
        pool: Option<&dyn DeploymentPool>,
        fallback_model: Option<&str>,
        operation: Operation,
    ) -> AppResult<ModelResponse> {
        let strategy = match decide(&payload, pool, fallback_model, operation) {
            Ok(strategy) => strategy,
            Err(e) => {
                self.metrics.record_unresolved(operation);
                tracing::warn!(
                    operation = %operation,
                    model = payload.model_or_empty(),
                    has_pool = pool.is_some(),
                    "No routing rule matched request"
                );
                return Err(e);
            }
        };

        tracing::info!(
            operation = %operation,
            model = payload.model_or_empty(),
            strategy = strategy.as_str(),
            "Dispatching request"
        );
        self.metrics.record_route(operation, strategy);

        let started = Instant::now();
        let result = self.execute(strategy, payload, pool, operation).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        if let Err(e) = self.metrics.record_dispatch_duration(strategy, elapsed_ms) {
            tracing::warn!(error = %e, "Failed to record dispatch duration");
        }

        if let Err(e) = &result {
            tracing::debug!(
                operation = %operation,
                strategy = strategy.as_str(),
                error = %e,
                "Downstream operation failed"
            );
        }

        result
    }

    async fn execute(
        &self,
        strategy: RouteStrategy,
        mut payload: RoutePayload,
        pool: Option<&dyn DeploymentPool>,
        operation: Operation,
    ) -> AppResult<ModelResponse> {
        match strategy {
            RouteStrategy::DirectCredential
            | RouteStrategy::PassThroughAll
            | RouteStrategy::SingleModel => {
                operation.invoke_access(self.access.as_ref(), payload).await
            }
            RouteStrategy::EphemeralPool => {
                let raw = payload.user_config.take().ok_or_else(|| {
                    AppError::Internal("ephemeral pool selected without user_config".to_string())
                })?;
                let user_pool = self.factory.build(PoolConfig::from_user_config(raw)?)?;
                operation
                    .invoke_pool(user_pool.as_ref(), PoolRequest::new(payload))
                    .await
            }
            RouteStrategy::FanOutFastest => {
                claimed(pool, strategy)?
                    .batch_completion_fastest_response(payload)
                    .await
            }
            RouteStrategy::FanOutBatch => {
                let pool = claimed(pool, strategy)?;
                let models = split_model_list(&payload.model.take().unwrap_or_default());
                pool.batch_completion(models, payload).await
            }
            RouteStrategy::PoolModel | RouteStrategy::PoolAlias | RouteStrategy::PoolDefault => {
                operation
                    .invoke_pool(claimed(pool, strategy)?, PoolRequest::new(payload))
                    .await
            }
            RouteStrategy::PoolSpecificDeployment => {
                operation
                    .invoke_pool(
                        claimed(pool, strategy)?,
                        PoolRequest::specific_deployment(payload),
                    )
                    .await
            }
        }
    }
}

/// The shared pool a pool strategy was selected for
fn claimed<'a>(
    pool: Option<&'a dyn DeploymentPool>,
    strategy: RouteStrategy,
) -> AppResult<&'a dyn DeploymentPool> {
    pool.ok_or_else(|| {
        AppError::Internal(format!(
            "strategy {} selected without a deployment pool",
            strategy.as_str()
        ))
    })
}
