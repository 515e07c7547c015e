//! Configuration management for Modelgate
//!
//! Parses TOML configuration files and provides typed access to settings.
//! The `[pool]` table shares its shape with the JSON `user_config` object a
//! request may carry, so both go through [`PoolConfig::validate`].

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub passthrough: PassthroughConfig,
    #[serde(default)]
    pub pool: Option<PoolConfig>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    30
}

/// Routing configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// Model served directly through the passthrough surface when no pool is configured
    #[serde(default)]
    pub single_model: Option<String>,
}

/// Generic model-access surface settings
///
/// Used for direct-credential requests, pass-through-all pools and
/// single-model mode. Requests may override `api_base` per call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PassthroughConfig {
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Deployment pool configuration
///
/// Loaded from the `[pool]` table at startup, or from a request's
/// `user_config` object for an ephemeral pool.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub model_list: Vec<DeploymentConfig>,
    /// Caller-facing alias → registered model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_group_alias: Option<HashMap<String, String>>,
    #[serde(default)]
    pub general_settings: GeneralSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_deployment: Option<DeploymentParams>,
}

/// Pool-wide behaviour switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneralSettings {
    /// Send models the pool does not know straight to the passthrough surface
    #[serde(default)]
    pub pass_through_all_models: bool,
}

/// One entry of a pool's model list
///
/// `model_name` is the model group callers ask for. An entry whose
/// `model_name` has the form `<provider>/*` is a provider-level default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeploymentConfig {
    model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(flatten)]
    params: DeploymentParams,
}

impl DeploymentConfig {
    pub fn new(model_name: impl Into<String>, params: DeploymentParams) -> Self {
        Self {
            model_name: model_name.into(),
            id: None,
            params,
        }
    }

    /// Set an explicit deployment id (otherwise one is generated by the pool)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Get the model group name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Get the configured deployment id, if any
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Get the connection parameters
    pub fn params(&self) -> &DeploymentParams {
        &self.params
    }

    /// Provider prefix when this entry is a `<provider>/*` wildcard
    pub fn provider_wildcard(&self) -> Option<&str> {
        self.model_name
            .strip_suffix("/*")
            .filter(|provider| !provider.is_empty())
    }
}

/// Connection parameters of a single deployment
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeploymentParams {
    /// Deployment-specific name, unique per backend target (e.g. `azure/gpt-4-eu`)
    #[serde(default)]
    model: String,
    api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    /// Model name sent upstream; defaults to `model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upstream_model: Option<String>,
}

impl DeploymentParams {
    pub fn new(model: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_base: api_base.into(),
            api_key: None,
            upstream_model: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_upstream_model(mut self, upstream_model: impl Into<String>) -> Self {
        self.upstream_model = Some(upstream_model.into());
        self
    }

    /// Get the deployment-specific name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the upstream base URL
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the upstream credential, if configured
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Get the explicit upstream model override, if configured
    pub fn upstream_model(&self) -> Option<&str> {
        self.upstream_model.as_deref()
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

/// Log line layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn validate_api_base(owner: &str, api_base: &str) -> AppResult<()> {
    if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
        return Err(AppError::Config(format!(
            "{} has invalid api_base '{}'. api_base must start with 'http://' or 'https://'.",
            owner, api_base
        )));
    }
    Ok(())
}

impl PoolConfig {
    /// Parse and validate a request-supplied `user_config` object
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the object does not describe a pool
    /// or fails [`PoolConfig::validate`].
    pub fn from_user_config(value: serde_json::Value) -> AppResult<Self> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| AppError::Config(format!("Invalid user_config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate a pool definition
    ///
    /// Called for the startup pool by `Config::validate()` and for every
    /// request-supplied `user_config` before an ephemeral pool is built.
    pub fn validate(&self) -> AppResult<()> {
        let mut ids = HashSet::new();

        for deployment in &self.model_list {
            if deployment.model_name.trim().is_empty() {
                return Err(AppError::Config(
                    "pool.model_list entry has an empty model_name".to_string(),
                ));
            }

            if deployment.params.model.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "Deployment '{}' has an empty model. Every model_list entry needs a \
                    deployment-specific model name.",
                    deployment.model_name
                )));
            }

            validate_api_base(
                &format!("Deployment '{}'", deployment.model_name),
                &deployment.params.api_base,
            )?;

            if let Some(id) = &deployment.id
                && !ids.insert(id.as_str())
            {
                return Err(AppError::Config(format!(
                    "Deployment id '{}' is used more than once in pool.model_list",
                    id
                )));
            }
        }

        if let Some(aliases) = &self.model_group_alias {
            for (alias, target) in aliases {
                if !self.model_list.iter().any(|d| d.model_name == *target) {
                    return Err(AppError::Config(format!(
                        "Alias '{}' points to '{}', which is not a model_name in pool.model_list",
                        alias, target
                    )));
                }
            }
        }

        if let Some(default) = &self.default_deployment {
            validate_api_base("pool.default_deployment", &default.api_base)?;
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()` and `from_str()`, but can
    /// also be called explicitly when constructing Config via other means.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "request_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.server.request_timeout_seconds > 300 {
            return Err(AppError::Config(format!(
                "request_timeout_seconds cannot exceed 300 seconds (5 minutes), got {}",
                self.server.request_timeout_seconds
            )));
        }

        if let Some(api_base) = &self.passthrough.api_base {
            validate_api_base("passthrough", api_base)?;
        }

        if let Some(model) = &self.routing.single_model
            && model.trim().is_empty()
        {
            return Err(AppError::Config(
                "routing.single_model cannot be empty when set".to_string(),
            ));
        }

        if let Some(pool) = &self.pool {
            pool.validate()?;
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 4000
request_timeout_seconds = 30

[passthrough]
api_base = "https://api.openai.com/v1"

[pool]
model_group_alias = { "gpt4" = "gpt-4" }

[pool.general_settings]
pass_through_all_models = false

[[pool.model_list]]
model_name = "gpt-4"
model = "azure/gpt-4-eu"
id = "eu-1"
api_base = "https://eu.example.com/v1"
upstream_model = "gpt-4"

[[pool.model_list]]
model_name = "gpt-4"
model = "azure/gpt-4-us"
api_base = "https://us.example.com/v1"
api_key = "sk-us"

[[pool.model_list]]
model_name = "anthropic/*"
model = "anthropic/*"
api_base = "https://anthropic-proxy.example.com/v1"

[observability]
log_level = "debug"
log_format = "compact"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, LogFormat::Compact);
        assert!(config.routing.single_model.is_none());
    }

    #[test]
    fn test_config_parses_pool() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        let pool = config.pool.expect("pool should be present");

        assert_eq!(pool.model_list.len(), 3);
        assert_eq!(pool.model_list[0].model_name(), "gpt-4");
        assert_eq!(pool.model_list[0].id(), Some("eu-1"));
        assert_eq!(pool.model_list[0].params().model(), "azure/gpt-4-eu");
        assert_eq!(pool.model_list[0].params().upstream_model(), Some("gpt-4"));
        assert_eq!(pool.model_list[1].params().api_key(), Some("sk-us"));
        assert_eq!(
            pool.model_group_alias.as_ref().and_then(|a| a.get("gpt4")),
            Some(&"gpt-4".to_string())
        );
        assert!(!pool.general_settings.pass_through_all_models);
    }

    #[test]
    fn test_provider_wildcard_detection() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        let pool = config.pool.expect("pool should be present");
        assert_eq!(pool.model_list[2].provider_wildcard(), Some("anthropic"));
        assert_eq!(pool.model_list[0].provider_wildcard(), None);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 4000
"#,
        )
        .expect("minimal config should parse");
        assert_eq!(config.server.request_timeout_seconds, 30);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.observability.log_format, LogFormat::Full);
        assert!(config.pool.is_none());
        assert!(config.passthrough.api_base.is_none());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = Config::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 4000
request_timeout_seconds = 0
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_timeout_over_limit() {
        let result = Config::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 4000
request_timeout_seconds = 301
"#,
        );
        let err = result.expect_err("timeout over 300s should fail");
        assert!(err.to_string().contains("cannot exceed 300"));
    }

    #[test]
    fn test_rejects_invalid_passthrough_base() {
        let result = Config::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 4000

[passthrough]
api_base = "api.openai.com/v1"
"#,
        );
        let err = result.expect_err("scheme-less api_base should fail");
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_rejects_empty_single_model() {
        let result = Config::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 4000

[routing]
single_model = "  "
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pool_rejects_dangling_alias() {
        let pool: PoolConfig = serde_json::from_value(serde_json::json!({
            "model_list": [
                {"model_name": "gpt-4", "model": "openai/gpt-4", "api_base": "http://localhost:1/v1"}
            ],
            "model_group_alias": {"fast": "gpt-3.5"}
        }))
        .expect("should deserialize");

        let err = pool.validate().expect_err("alias target missing");
        assert!(err.to_string().contains("gpt-3.5"));
    }

    #[test]
    fn test_pool_rejects_duplicate_ids() {
        let params = DeploymentParams::new("openai/gpt-4", "http://localhost:1/v1");
        let pool = PoolConfig {
            model_list: vec![
                DeploymentConfig::new("gpt-4", params.clone()).with_id("dup"),
                DeploymentConfig::new("gpt-4", params).with_id("dup"),
            ],
            ..PoolConfig::default()
        };
        let err = pool.validate().expect_err("duplicate id should fail");
        assert!(err.to_string().contains("dup"));
    }

    #[test]
    fn test_pool_rejects_empty_deployment_model() {
        let pool = PoolConfig {
            model_list: vec![DeploymentConfig::new(
                "gpt-4",
                DeploymentParams::new("", "http://localhost:1/v1"),
            )],
            ..PoolConfig::default()
        };
        assert!(pool.validate().is_err());
    }

    #[test]
    fn test_pool_rejects_invalid_default_deployment_base() {
        let pool = PoolConfig {
            default_deployment: Some(DeploymentParams::new("fallback", "localhost:8080")),
            ..PoolConfig::default()
        };
        assert!(pool.validate().is_err());
    }

    #[test]
    fn test_pool_config_from_json_user_config() {
        let pool: PoolConfig = serde_json::from_value(serde_json::json!({
            "model_list": [
                {
                    "model_name": "my-model",
                    "model": "openai/my-model",
                    "api_base": "http://localhost:8000/v1",
                    "api_key": "sk-test"
                }
            ],
            "general_settings": {"pass_through_all_models": true}
        }))
        .expect("user_config JSON should deserialize");

        assert!(pool.validate().is_ok());
        assert!(pool.general_settings.pass_through_all_models);
        assert_eq!(pool.model_list[0].params().api_key(), Some("sk-test"));
    }

    #[test]
    fn test_user_config_parses_and_validates() {
        let config = PoolConfig::from_user_config(serde_json::json!({
            "model_list": [{
                "model_name": "custom",
                "model": "openai/custom",
                "api_base": "http://localhost:8000/v1"
            }]
        }))
        .expect("user_config should parse");
        assert_eq!(config.model_list[0].model_name(), "custom");
    }

    #[test]
    fn test_malformed_user_config_is_config_error() {
        let err = PoolConfig::from_user_config(serde_json::json!({
            "model_list": [{"model_name": "gpt-4", "litellm_params": {"model": "x"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("user_config")));

        let err = PoolConfig::from_user_config(serde_json::json!("not an object")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_user_config_semantic_errors_surface() {
        let err = PoolConfig::from_user_config(serde_json::json!({
            "model_list": [{"model_name": "m", "model": "p/m", "api_base": "ftp://nope"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("api_base"));
    }
}
