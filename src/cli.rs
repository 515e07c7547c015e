//! Command-line interface for Modelgate
//!
//! Provides argument parsing and subcommand handling for the Modelgate binary.

use clap::{Parser, Subcommand};

/// OpenAI-compatible model request dispatcher
#[derive(Parser)]
#[command(name = "modelgate")]
#[command(version)]
#[command(about = "OpenAI-compatible model request dispatcher")]
#[command(
    long_about = "Modelgate serves OpenAI-compatible endpoints and dispatches each request \
    to a deployment pool, an ephemeral per-request pool, a multi-model fan-out, or a \
    passthrough upstream."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Modelgate Configuration
# =======================

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
host = "0.0.0.0"
port = 4000

# Upstream request timeout in seconds (1-300)
request_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# ROUTING
# ─────────────────────────────────────────────────────────────────────────────

[routing]
# Served through [passthrough] when no [pool] is configured.
# single_model = "gpt-4o-mini"

# ─────────────────────────────────────────────────────────────────────────────
# PASSTHROUGH
# ─────────────────────────────────────────────────────────────────────────────
#
# Used for requests that carry their own api_key, for unknown models when
# pass_through_all_models is enabled, and in single-model mode. A request
# may override api_base with its own "api_base" field.

[passthrough]
api_base = "https://api.openai.com/v1"
# api_key = "sk-..."

# ─────────────────────────────────────────────────────────────────────────────
# DEPLOYMENT POOL
# ─────────────────────────────────────────────────────────────────────────────
#
# Entry fields:
#   - model_name: model group callers request ("<provider>/*" = provider default)
#   - model: deployment-specific name (request it to pin this deployment)
#   - id: optional deployment id (generated when omitted)
#   - api_base: OpenAI-compatible base URL
#   - api_key: optional upstream credential
#   - upstream_model: model name sent upstream (defaults to model)

[pool]
model_group_alias = { "gpt4" = "gpt-4" }

[pool.general_settings]
# Send models the pool does not know to [passthrough]
pass_through_all_models = false

[[pool.model_list]]
model_name = "gpt-4"
model = "openai/gpt-4-primary"
api_base = "http://your-server:port/v1"
upstream_model = "gpt-4"

[[pool.model_list]]
model_name = "text-embedding-3-small"
model = "openai/text-embedding-3-small"
api_base = "http://your-server:port/v1"
upstream_model = "text-embedding-3-small"

# Optional catch-all for models nothing else matches:
# [pool.default_deployment]
# api_base = "http://your-fallback:port/v1"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"
# "full" or "compact"
log_format = "full"

# Prometheus metrics are always available at /metrics on the server port
"#
}
