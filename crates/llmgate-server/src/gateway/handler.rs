use std::collections::HashMap;

use axum::{
    Extension, Json,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use tracing::{debug, error, info, instrument};

use llmgate::{
    CacheStatus, GenerationRequest, GenerationResult, LLMGATE_CACHE_HEADER, SUMMARIZE_TEMPERATURE,
};

use crate::gateway::error::GatewayError;
use crate::gateway::payload::{ChatRequest, ChatResponse, SummarizeResponse};
use crate::gateway::request_id::RequestId;
use crate::gateway::state::HandlerState;

#[instrument(skip(state, request_id, body), fields(request_id = %request_id.as_str()))]
pub async fn chat_handler(
    State(state): State<HandlerState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let request = ChatRequest::from_value(body)?;

    let generation = GenerationRequest::new(request.prompt, request_id.0)
        .with_temperature(request.temperature)
        .with_max_tokens(request.max_tokens)
        .with_tracer(state.tracer.clone());

    let (result, status) = generate_complete(&state, generation).await?;

    Ok((
        StatusCode::OK,
        cache_headers(status),
        Json(ChatResponse {
            response: result.text,
            model: result.model,
            latency: result.latency,
            cache_hit: status.is_hit(),
        }),
    )
        .into_response())
}

#[instrument(skip(state, request_id, body), fields(request_id = %request_id.as_str()))]
pub async fn chat_stream_handler(
    State(state): State<HandlerState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let request = ChatRequest::from_value(body)?;
    let log_id = request_id.0.clone();

    let generation = GenerationRequest::new(request.prompt, request_id.0)
        .with_temperature(request.temperature)
        .with_max_tokens(request.max_tokens)
        .streaming(true)
        .with_tracer(state.tracer.clone());

    let response = state.orchestrator.generate_with_cache(generation).await?;
    let status = response.status;
    let stream = response.outcome.into_stream().ok_or_else(|| {
        GatewayError::InternalError("Streaming request produced an atomic result".to_string())
    })?;

    // Headers are already sent when a fragment fails, so the error can only end the body.
    let body = Body::from_stream(stream.map(move |item| match item {
        Ok(fragment) => Ok(fragment.into_text()),
        Err(e) => {
            error!(request_id = %log_id, error = %e, "stream aborted");
            Err(e)
        }
    }));

    let mut headers = cache_headers(status);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("X-Accel-Buffering", HeaderValue::from_static("no"));

    Ok((StatusCode::OK, headers, body).into_response())
}

#[instrument(skip(state, request_id, body), fields(request_id = %request_id.as_str(), prompt_version = tracing::field::Empty))]
pub async fn summarize_handler(
    State(state): State<HandlerState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let request = ChatRequest::from_value(body)?;

    let version = state.variants.choose().to_string();
    tracing::Span::current().record("prompt_version", tracing::field::display(&version));

    let prompts = state.prompts.clone();
    let name = state.summarizer_prompt.clone();
    let load_version = version.clone();
    let definition = tokio::task::spawn_blocking(move || prompts.load(&name, &load_version))
        .await
        .map_err(|e| GatewayError::InternalError(format!("Prompt load task failed: {}", e)))??;

    let variables = HashMap::from([("text".to_string(), request.prompt)]);
    let final_prompt = state.prompts.render(&definition, &variables);
    debug!(prompt_len = final_prompt.len(), "summarize prompt rendered");

    let generation = GenerationRequest::new(final_prompt, request_id.0)
        .with_temperature(SUMMARIZE_TEMPERATURE)
        .with_max_tokens(request.max_tokens)
        .with_prompt_version(version.clone())
        .with_tracer(state.tracer.clone());

    let (result, status) = generate_complete(&state, generation).await?;
    info!(prompt_version = %version, cache_hit = status.is_hit(), "summarize complete");

    Ok((
        StatusCode::OK,
        cache_headers(status),
        Json(SummarizeResponse {
            summary: result.text,
            model: result.model,
            cache_hit: status.is_hit(),
            prompt_version: version,
        }),
    )
        .into_response())
}

async fn generate_complete(
    state: &HandlerState,
    generation: GenerationRequest,
) -> Result<(GenerationResult, CacheStatus), GatewayError> {
    let response = state.orchestrator.generate_with_cache(generation).await?;
    let status = response.status;
    let result = response.outcome.into_result().ok_or_else(|| {
        GatewayError::InternalError("Atomic request produced a stream".to_string())
    })?;
    Ok((result, status))
}

pub(crate) fn cache_headers(status: CacheStatus) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        LLMGATE_CACHE_HEADER,
        HeaderValue::from_static(status.as_header_value()),
    );
    headers
}
