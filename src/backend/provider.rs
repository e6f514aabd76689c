//! Provider-backed [`LlmBackend`] on the `genai` multi-provider client.

use std::time::Instant;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent};
use tracing::{error, info};

use super::{
    BackendCall, BackendError, BackendResult, FragmentStream, GenerationResult, LlmBackend,
    StreamFragment,
};
use crate::constants::live_metadata;

/// Calls the configured provider through a shared [`genai::Client`].
///
/// Credentials are resolved by the client from the provider's usual environment variable
/// (e.g. `GEMINI_API_KEY`).
#[derive(Debug, Clone, Default)]
pub struct GenaiBackend {
    client: Client,
}

impl GenaiBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn request(call: &BackendCall<'_>) -> (ChatRequest, ChatOptions) {
        let request = ChatRequest::new(vec![ChatMessage::user(call.prompt)]);
        let options = ChatOptions::default()
            .with_temperature(call.temperature)
            .with_max_tokens(call.max_tokens);
        (request, options)
    }
}

#[async_trait]
impl LlmBackend for GenaiBackend {
    async fn generate(&self, call: BackendCall<'_>) -> BackendResult<GenerationResult> {
        let (request, options) = Self::request(&call);
        let start = Instant::now();

        let response = self
            .client
            .exec_chat(call.model, request, Some(&options))
            .await
            .map_err(|e| {
                error!(
                    request_id = call.request_id,
                    model = call.model,
                    error = %e,
                    "llm_chat_call_failed"
                );
                BackendError::new(call.request_id, call.model, e)
            })?;

        let latency = start.elapsed().as_secs_f64();
        let text = response.first_text().unwrap_or_default().to_string();

        info!(
            request_id = call.request_id,
            model = call.model,
            latency = latency,
            prompt_length = call.prompt.len(),
            response_length = text.len(),
            "llm_chat_call_success"
        );

        Ok(GenerationResult {
            text,
            model: call.model.to_string(),
            latency,
        })
    }

    async fn stream_generate(&self, call: BackendCall<'_>) -> BackendResult<FragmentStream> {
        let (request, options) = Self::request(&call);
        let start = Instant::now();

        let response = self
            .client
            .exec_chat_stream(call.model, request, Some(&options))
            .await
            .map_err(|e| {
                error!(
                    request_id = call.request_id,
                    model = call.model,
                    error = %e,
                    "llm_stream_call_failed"
                );
                BackendError::new(call.request_id, call.model, e)
            })?;

        // Time to stream-open, not to completion.
        let latency = start.elapsed().as_secs_f64();

        info!(
            request_id = call.request_id,
            model = call.model,
            latency = latency,
            prompt_length = call.prompt.len(),
            "llm_stream_call_success"
        );

        let request_id = call.request_id.to_string();
        let model = call.model.to_string();
        let trailer = live_metadata(&model, latency);

        let fragments = response.stream.filter_map(move |event| {
            let request_id = request_id.clone();
            let model = model.clone();
            async move {
                match event {
                    Ok(ChatStreamEvent::Chunk(chunk)) if !chunk.content.is_empty() => {
                        Some(Ok(StreamFragment::Text(chunk.content)))
                    }
                    Ok(_) => None,
                    Err(e) => {
                        error!(
                            request_id = %request_id,
                            model = %model,
                            error = %e,
                            "llm_stream_call_failed"
                        );
                        Some(Err(BackendError::new(request_id, model, e)))
                    }
                }
            }
        });

        let trailer = stream::once(async move { Ok(StreamFragment::Metadata(trailer)) });

        Ok(fragments.chain(trailer).boxed())
    }

    fn name(&self) -> &'static str {
        "genai"
    }
}
