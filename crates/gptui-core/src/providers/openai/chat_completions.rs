//! OpenAI-compatible Chat Completions client.

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::sync::mpsc;

use super::sse::SseDataStream;
use super::types::{CompletionRequest, CompletionResponse, StreamChunk};
use crate::config::{ChatSettings, SamplingParams};
use crate::providers::shared::{ChatError, ChatResult, Message};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Decoded stream events, in wire order.
pub type ChunkStream = BoxStream<'static, ChatResult<StreamChunk>>;

/// Chat Completions client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChatClient {
    transport: HttpTransport,
    api_key: String,
    model: String,
    sampling: SamplingParams,
}

impl ChatClient {
    pub fn new(settings: &ChatSettings) -> Self {
        Self {
            transport: HttpTransport::new(&settings.base_url)
                .with_timeout(settings.request_timeout),
            api_key: settings.api_key.trim().to_string(),
            model: settings.model.clone(),
            sampling: settings.sampling,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Builds the request for the next turn.
    ///
    /// `text` is appended to a copy of `history`. The system prompt is
    /// prepended only when `history` is empty, so it is sent on the first
    /// turn and never repeated.
    pub fn build_request(
        &self,
        history: &[Message],
        text: &str,
        system_prompt: Option<&str>,
        stream: bool,
    ) -> CompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if history.is_empty()
            && let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty())
        {
            messages.push(Message::system(prompt));
        }
        messages.extend_from_slice(history);
        messages.push(Message::user(text));

        CompletionRequest {
            model: self.model.clone(),
            messages,
            stream,
            temperature: self.sampling.temperature,
            top_p: self.sampling.top_p,
            max_tokens: self.sampling.max_tokens,
        }
    }

    /// Performs a non-streaming completion.
    ///
    /// # Errors
    /// Fails with `Auth` before any network call when no key is configured,
    /// `HttpStatus` on a non-200 response and `Decode` on a malformed body.
    pub async fn complete(&self, request: &CompletionRequest) -> ChatResult<CompletionResponse> {
        let response = self.post(request, false).await?;
        let body = response.text().await?;

        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| ChatError::decode(&e))?;
        tracing::debug!(
            choices = parsed.choices.len(),
            finish_reason = parsed.choices.first().and_then(|c| c.finish_reason.as_deref()),
            "completion received"
        );
        Ok(parsed)
    }

    /// Opens a streaming completion and returns its decoded events.
    ///
    /// # Errors
    /// Same failures as [`ChatClient::complete`] up to the response status.
    /// Decode and body errors arrive later as stream items.
    pub async fn stream_response(&self, request: &CompletionRequest) -> ChatResult<ChunkStream> {
        let response = self.post(request, true).await?;
        Ok(SseDataStream::new(response.bytes_stream()).boxed())
    }

    /// Streams a completion into `tx`, one message per event.
    ///
    /// Returns after the `[DONE]` sentinel, at the end of the body, or at the
    /// first error. A closed receiver ends the call with `Cancelled`.
    ///
    /// # Errors
    /// Any error from [`ChatClient::stream_response`] or from the stream itself.
    pub async fn stream(
        &self,
        request: &CompletionRequest,
        tx: mpsc::Sender<StreamChunk>,
    ) -> ChatResult<()> {
        let mut events = self.stream_response(request).await?;
        let mut delivered = 0usize;

        while let Some(event) = events.next().await {
            let chunk = event?;
            if tx.send(chunk).await.is_err() {
                tracing::debug!(delivered, "stream receiver dropped");
                return Err(ChatError::Cancelled);
            }
            delivered += 1;
        }

        tracing::debug!(delivered, "stream finished");
        Ok(())
    }

    async fn post(&self, request: &CompletionRequest, streaming: bool) -> ChatResult<HttpResponse> {
        if self.api_key.is_empty() {
            return Err(ChatError::Auth);
        }

        let mut http_request = HttpRequest::post(CHAT_COMPLETIONS_PATH)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key));
        if streaming {
            http_request = http_request
                .header("Accept", "text/event-stream")
                .header("Cache-Control", "no-cache")
                .header("Connection", "keep-alive")
                .streaming();
        }
        let http_request = http_request.json(request).map_err(|e| ChatError::decode(&e))?;

        let response = self.transport.send(http_request).await?;
        let status = response.status();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, "chat completion request failed");
            return Err(ChatError::http_status(status, body));
        }
        if streaming {
            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            tracing::debug!(content_type, "stream opened");
        }

        Ok(response)
    }
}
