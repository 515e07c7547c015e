//! OpenAI-compatible models list handler
//!
//! Handles GET /v1/models requests.

use crate::handlers::AppState;
use crate::pool::PoolView;
use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Model entry in the list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelObject {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl ModelObject {
    pub fn new(id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            created: 0,
            owned_by: owned_by.into(),
        }
    }
}

/// Response for GET /v1/models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsListResponse {
    pub object: String,
    pub data: Vec<ModelObject>,
}

impl ModelsListResponse {
    pub fn new(models: Vec<ModelObject>) -> Self {
        Self {
            object: "list".to_string(),
            data: models,
        }
    }
}

/// GET /v1/models handler
///
/// Lists the shared pool's model groups (`owned_by: "pool"`) and aliases
/// (`owned_by: "alias"`), sorted by name. In single-model mode the fallback
/// model is listed instead (`owned_by: "passthrough"`).
pub async fn handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut models = Vec::new();

    if let Some(pool) = state.pool() {
        let names: BTreeSet<&String> = pool.model_names().iter().collect();
        models.extend(names.into_iter().map(|name| ModelObject::new(name, "pool")));

        if let Some(aliases) = pool.model_group_alias() {
            let aliases: BTreeSet<&String> = aliases.keys().collect();
            models.extend(aliases.into_iter().map(|alias| ModelObject::new(alias, "alias")));
        }
    } else if let Some(model) = state.single_model() {
        models.push(ModelObject::new(model, "passthrough"));
    }

    Json(ModelsListResponse::new(models))
}
