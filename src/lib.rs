//! Modelgate - OpenAI-compatible model request dispatcher
//!
//! Routes each model request to exactly one execution path: the caller's own
//! upstream credentials, an ephemeral pool built from the request, a
//! multi-model fan-out, the configured deployment pool, or a single
//! passthrough model.

pub mod access;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod pool;
pub mod telemetry;
pub mod upstream;
