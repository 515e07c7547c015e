//! JSON extractor with OpenAI-style error bodies
//!
//! Wraps Axum's `Json` extractor so malformed request bodies are reported
//! in the `{"error": {"message", "type", ...}}` shape OpenAI SDKs parse.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// OpenAI-compatible error envelope
#[derive(Debug, Serialize)]
pub struct OpenAiError {
    pub error: OpenAiErrorBody,
}

#[derive(Debug, Serialize)]
pub struct OpenAiErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: &'static str,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl OpenAiError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            error: OpenAiErrorBody {
                message: message.into(),
                error_type: "invalid_request_error",
                param: None,
                code: None,
            },
        }
    }
}

/// Rejection produced by [`OpenAiJson`]
///
/// - syntax errors → 400
/// - well-formed JSON of the wrong shape → 422
/// - missing `Content-Type: application/json` → 415
pub struct OpenAiJsonRejection(JsonRejection);

impl IntoResponse for OpenAiJsonRejection {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            JsonRejection::JsonDataError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        let message = match &self.0 {
            JsonRejection::MissingJsonContentType(_) => {
                "Content-Type must be application/json".to_string()
            }
            other => other.body_text(),
        };
        (status, Json(OpenAiError::invalid_request(message))).into_response()
    }
}

/// Drop-in replacement for `axum::Json` in the `/v1` handlers
pub struct OpenAiJson<T>(pub T);

impl<S, T> FromRequest<S> for OpenAiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = OpenAiJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| OpenAiJson(value))
            .map_err(OpenAiJsonRejection)
    }
}
