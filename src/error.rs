//! Error types for Modelgate
//!
//! All errors implement `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    /// No dispatch rule accepted the request.
    ///
    /// The display form is the exact client-facing detail message.
    #[error("{operation}: Invalid model name passed in model={model}")]
    RoutingUnresolved { operation: String, model: String },

    #[error("No deployment available for model '{model}'")]
    NoDeployment { model: String },

    #[error("Upstream {endpoint} returned {status}: {body}")]
    Upstream {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Request to {endpoint} failed: {reason}")]
    UpstreamRequest { endpoint: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::RoutingUnresolved { .. } => StatusCode::BAD_REQUEST,
            Self::NoDeployment { .. } => StatusCode::NOT_FOUND,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamRequest { .. } => StatusCode::BAD_GATEWAY,
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Unresolved routes keep the `detail` envelope existing proxy clients parse.
        let body = match &self {
            Self::RoutingUnresolved { .. } => serde_json::json!({
                "detail": { "error": self.to_string() },
            }),
            _ => serde_json::json!({
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_routing_unresolved_message() {
        let err = AppError::RoutingUnresolved {
            operation: "acompletion".to_string(),
            model: "unknown-model".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "acompletion: Invalid model name passed in model=unknown-model"
        );
    }

    #[test]
    fn test_routing_unresolved_with_empty_model() {
        let err = AppError::RoutingUnresolved {
            operation: "aembedding".to_string(),
            model: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "aembedding: Invalid model name passed in model="
        );
    }

    #[test]
    fn test_routing_unresolved_response_status() {
        let err = AppError::RoutingUnresolved {
            operation: "acompletion".to_string(),
            model: "x".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validation_error_response_status() {
        let err = AppError::Validation("test".to_string());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_status_passes_through() {
        let err = AppError::Upstream {
            endpoint: "http://localhost:1234/v1/chat/completions".to_string(),
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_upstream_request_failure_is_bad_gateway() {
        let err = AppError::UpstreamRequest {
            endpoint: "http://localhost:1/v1/embeddings".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_no_deployment_is_not_found() {
        let err = AppError::NoDeployment {
            model: "ghost".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_error_response_status() {
        let err = AppError::Internal("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
