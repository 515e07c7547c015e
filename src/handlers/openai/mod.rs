//! OpenAI-compatible API handlers
//!
//! Each `POST /v1/...` endpoint maps to one [`Operation`] and hands the
//! request body to the dispatcher together with the shared pool and the
//! configured single model.

pub mod extractor;
pub mod models;

use crate::dispatch::{ModelResponse, Operation, RoutePayload};
use crate::error::AppResult;
use crate::handlers::AppState;
use crate::middleware::RequestId;
use axum::{Extension, extract::State};
use extractor::OpenAiJson;

async fn dispatch_operation(
    state: &AppState,
    request_id: RequestId,
    operation: Operation,
    payload: RoutePayload,
) -> AppResult<ModelResponse> {
    tracing::debug!(
        request_id = %request_id,
        operation = %operation,
        model = payload.model_or_empty(),
        "Received model request"
    );

    state
        .dispatcher()
        .route(payload, state.pool(), state.single_model(), operation)
        .await
        .inspect_err(|e| {
            tracing::info!(
                request_id = %request_id,
                operation = %operation,
                error = %e,
                "Model request failed"
            );
        })
}

/// POST /v1/chat/completions
pub async fn chat_completions(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    OpenAiJson(payload): OpenAiJson<RoutePayload>,
) -> AppResult<ModelResponse> {
    dispatch_operation(&state, request_id, Operation::Completion, payload).await
}

/// POST /v1/completions
pub async fn completions(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    OpenAiJson(payload): OpenAiJson<RoutePayload>,
) -> AppResult<ModelResponse> {
    dispatch_operation(&state, request_id, Operation::TextCompletion, payload).await
}

/// POST /v1/embeddings
pub async fn embeddings(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    OpenAiJson(payload): OpenAiJson<RoutePayload>,
) -> AppResult<ModelResponse> {
    dispatch_operation(&state, request_id, Operation::Embedding, payload).await
}

/// POST /v1/images/generations
pub async fn image_generations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    OpenAiJson(payload): OpenAiJson<RoutePayload>,
) -> AppResult<ModelResponse> {
    dispatch_operation(&state, request_id, Operation::ImageGeneration, payload).await
}

/// POST /v1/audio/speech
pub async fn speech(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    OpenAiJson(payload): OpenAiJson<RoutePayload>,
) -> AppResult<ModelResponse> {
    dispatch_operation(&state, request_id, Operation::Speech, payload).await
}

/// POST /v1/audio/transcriptions
///
/// Accepts a JSON body; multipart uploads are not decoded here.
pub async fn transcriptions(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    OpenAiJson(payload): OpenAiJson<RoutePayload>,
) -> AppResult<ModelResponse> {
    dispatch_operation(&state, request_id, Operation::Transcription, payload).await
}

/// POST /v1/moderations
pub async fn moderations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    OpenAiJson(payload): OpenAiJson<RoutePayload>,
) -> AppResult<ModelResponse> {
    dispatch_operation(&state, request_id, Operation::Moderation, payload).await
}
