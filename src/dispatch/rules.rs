//! Dispatch rules
//!
//! Pure, ordered evaluation of a request against the routing context.
//! The first rule that matches wins; nothing here touches the payload, so
//! the strategy that is eventually executed is the only one that consumes it.

use super::{Operation, RoutePayload, RouteStrategy};
use crate::error::{AppError, AppResult};
use crate::pool::PoolView;

/// Select the routing strategy for a request
///
/// # Rule Order
/// 1. `api_key` present → [`RouteStrategy::DirectCredential`]
/// 2. `user_config` present → [`RouteStrategy::EphemeralPool`]
/// 3. comma in `model`, pool present, completion → fan-out
///    ([`RouteStrategy::FanOutFastest`] when `fastest_response` is set,
///    otherwise [`RouteStrategy::FanOutBatch`])
/// 4. pool present → registered name or id, alias, deployment name,
///    then pass-through-all or the pool's defaults
/// 5. no pool but a fallback model → [`RouteStrategy::SingleModel`]
///
/// # Errors
/// Returns [`AppError::RoutingUnresolved`] when no rule matches. A pool that
/// matches nothing in rule 4 does not fall back to single-model mode.
pub fn decide<P>(
    payload: &RoutePayload,
    pool: Option<&P>,
    fallback_model: Option<&str>,
    operation: Operation,
) -> AppResult<RouteStrategy>
where
    P: PoolView + ?Sized,
{
    if payload.api_key.is_some() {
        return Ok(RouteStrategy::DirectCredential);
    }

    if payload.user_config.is_some() {
        return Ok(RouteStrategy::EphemeralPool);
    }

    let model = payload.model_or_empty();

    if model.contains(',') && pool.is_some() && operation == Operation::Completion {
        return Ok(if payload.wants_fastest_response() {
            RouteStrategy::FanOutFastest
        } else {
            RouteStrategy::FanOutBatch
        });
    }

    if let Some(pool) = pool {
        if let Some(strategy) = evaluate_pool(pool, model) {
            return Ok(strategy);
        }
    } else if fallback_model.is_some() {
        return Ok(RouteStrategy::SingleModel);
    }

    Err(AppError::RoutingUnresolved {
        operation: operation.as_str().to_string(),
        model: model.to_string(),
    })
}

fn evaluate_pool<P>(pool: &P, model: &str) -> Option<RouteStrategy>
where
    P: PoolView + ?Sized,
{
    if pool.model_names().contains(model) || pool.model_ids().contains(model) {
        return Some(RouteStrategy::PoolModel);
    }

    if pool
        .model_group_alias()
        .is_some_and(|aliases| aliases.contains_key(model))
    {
        return Some(RouteStrategy::PoolAlias);
    }

    if pool.deployment_names().contains(model) {
        return Some(RouteStrategy::PoolSpecificDeployment);
    }

    if pool.general_settings().pass_through_all_models {
        return Some(RouteStrategy::PassThroughAll);
    }

    // Any default lets the pool take unknown names; it resolves them itself.
    if pool.default_deployment().is_some() || !pool.provider_default_deployments().is_empty() {
        return Some(RouteStrategy::PoolDefault);
    }

    None
}

/// Split a comma-separated model list into trimmed names
pub fn split_model_list(models: &str) -> Vec<String> {
    models.split(',').map(|m| m.trim().to_string()).collect()
}
