//! Chat dispatch HTTP handler.
//!
//! Classifies each request as image generation or standard streaming by its
//! model identifier, invokes the matching provider call, and republishes the
//! result as a stream of typed UI message-part events:
//!
//! - `text-start` / `text-delta` / `text-end`: one text segment per response
//! - `file`: a generated image as a base64 data URL with its media type
//! - `error`: upstream failure or idle timeout mid-stream
//! - `[DONE]`: stream terminator

use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::llm::{
    AspectRatio, ChatMessage, EventStream, GenerateRequest, GenerateResult, LlmError, StreamEvent,
    data_url,
};
use crate::response;
use crate::server::AppState;

/// Marker header the client-side stream consumer looks for.
const STREAM_MARKER_HEADER: &str = "x-vercel-ai-ui-message-stream";

// ============================================================================
// Request/Stream Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    /// Accepted for wire compatibility; not wired to any provider option.
    #[serde(default)]
    pub web_search: bool,
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
}

/// A typed message part in the outbound UI stream.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamPart {
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    File {
        url: String,
        #[serde(rename = "mediaType")]
        media_type: String,
    },
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
}

/// One item in the outbound event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UiEvent {
    Part(StreamPart),
    Terminator,
}

// ============================================================================
// Handler
// ============================================================================

/// POST /api/v1/chat
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    if req.web_search {
        debug!("webSearch flag set; no provider option is wired to it");
    }

    // Image-capable models are classified by identifier substring and served
    // with a one-shot call; everything else streams.
    if req.model.contains("image") {
        image_response(state, req).await
    } else {
        stream_response(state, req).await
    }
}

/// Image branch: a single awaited generation, re-emitted as a synthetic
/// incremental stream.
async fn image_response(state: AppState, req: ChatRequest) -> Response {
    let provider = state.providers.image();
    let request = GenerateRequest {
        model: req.model,
        messages: req.messages,
        aspect_ratio: Some(req.aspect_ratio.unwrap_or_default()),
    };
    debug!(model = %request.model, "dispatching image generation");

    let result = match provider.generate(request).await {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "image generation failed");
            return response::internal_error(format!("LLM request failed: {e}")).into_response();
        }
    };

    let events = one_shot_parts(&result, Ulid::new().to_string())
        .into_iter()
        .map(UiEvent::Part)
        .chain(std::iter::once(UiEvent::Terminator));

    ui_stream_response(
        futures::stream::iter(events),
        state.keep_alive_interval_seconds,
    )
}

/// Standard branch: relay the provider's native incremental stream.
async fn stream_response(state: AppState, req: ChatRequest) -> Response {
    let provider = state.providers.route(&req.model);
    let request = GenerateRequest {
        model: req.model,
        messages: req.messages,
        aspect_ratio: None,
    };
    debug!(model = %request.model, "dispatching streaming generation");

    let stream = match provider.generate_stream(request).await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "LLM request failed");
            return response::internal_error(format!("LLM request failed: {e}")).into_response();
        }
    };

    let ui_stream =
        UiMessageStream::new(stream, Duration::from_secs(state.idle_timeout_seconds));
    ui_stream_response(ui_stream, state.keep_alive_interval_seconds)
}

// ============================================================================
// Helpers
// ============================================================================

/// Adapt a completed one-shot result into the same event sequence a native
/// stream produces: exactly one text segment (emitted even when the text is
/// empty), then one file part per generated image.
fn one_shot_parts(result: &GenerateResult, text_id: String) -> Vec<StreamPart> {
    let mut parts = Vec::with_capacity(result.files.len() + 3);

    parts.push(StreamPart::TextStart {
        id: text_id.clone(),
    });
    if !result.text.is_empty() {
        parts.push(StreamPart::TextDelta {
            id: text_id.clone(),
            delta: result.text.clone(),
        });
    }
    parts.push(StreamPart::TextEnd { id: text_id });

    for file in &result.files {
        parts.push(StreamPart::File {
            url: data_url::encode(&file.media_type, &file.base64),
            media_type: file.media_type.clone(),
        });
    }

    parts
}

fn ui_stream_response<S>(stream: S, keep_alive_secs: u64) -> Response
where
    S: futures::Stream<Item = UiEvent> + Send + 'static,
{
    let events = stream.map(|event| {
        Ok::<_, Infallible>(match event {
            UiEvent::Part(part) => part_event(&part),
            UiEvent::Terminator => Event::default().data("[DONE]"),
        })
    });

    let keep_alive = KeepAlive::new()
        .interval(Duration::from_secs(keep_alive_secs))
        .text("keep-alive");

    let mut response = Sse::new(events).keep_alive(keep_alive).into_response();
    response
        .headers_mut()
        .insert(STREAM_MARKER_HEADER, HeaderValue::from_static("v1"));
    response
}

fn part_event(part: &StreamPart) -> Event {
    Event::default()
        .json_data(part)
        .unwrap_or_else(|_| Event::default().data("{}"))
}

// ============================================================================
// Streaming
// ============================================================================

/// Unified error type for streaming, flattening nested Results.
enum StreamError {
    Llm(LlmError),
    Timeout,
}

/// Inner stream type that flattens `Result<Result<T, LlmError>, Elapsed>`
/// into `Result<T, StreamError>`.
type FlattenedStream =
    Pin<Box<dyn futures::Stream<Item = Result<StreamEvent, StreamError>> + Send>>;

/// Adapts a provider's native token stream into the UI message-part event
/// sequence, preserving each upstream token as one `text-delta` with its
/// text content unchanged.
struct UiMessageStream {
    inner: FlattenedStream,
    text_id: String,
    started: bool,
    closed: bool,
    finished: bool,
}

impl UiMessageStream {
    fn new(inner: EventStream, idle_timeout: Duration) -> Self {
        // Wrap the inner stream with the idle timeout and flatten the nested
        // Results.
        let timed_stream = inner.timeout(idle_timeout);
        let flattened = timed_stream.map(|result| match result {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(llm_err)) => Err(StreamError::Llm(llm_err)),
            Err(_elapsed) => Err(StreamError::Timeout),
        });

        Self {
            inner: Box::pin(flattened),
            text_id: Ulid::new().to_string(),
            started: false,
            closed: false,
            finished: false,
        }
    }
}

impl futures::Stream for UiMessageStream {
    type Item = UiEvent;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        if self.finished {
            return Poll::Ready(None);
        }

        // Open the text segment on first poll
        if !self.started {
            self.started = true;
            let part = StreamPart::TextStart {
                id: self.text_id.clone(),
            };
            return Poll::Ready(Some(UiEvent::Part(part)));
        }

        // Segment closed; emit the terminator and stop
        if self.closed {
            self.finished = true;
            return Poll::Ready(Some(UiEvent::Terminator));
        }

        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(StreamEvent::Token(delta)))) => {
                let part = StreamPart::TextDelta {
                    id: self.text_id.clone(),
                    delta,
                };
                Poll::Ready(Some(UiEvent::Part(part)))
            }

            Poll::Ready(Some(Ok(StreamEvent::Done))) | Poll::Ready(None) => {
                self.closed = true;
                let part = StreamPart::TextEnd {
                    id: self.text_id.clone(),
                };
                Poll::Ready(Some(UiEvent::Part(part)))
            }

            Poll::Ready(Some(Err(StreamError::Timeout))) => {
                self.closed = true;
                let part = StreamPart::Error {
                    error_text: "stream idle timeout".to_string(),
                };
                Poll::Ready(Some(UiEvent::Part(part)))
            }

            Poll::Ready(Some(Err(StreamError::Llm(e)))) => {
                self.closed = true;
                let part = StreamPart::Error {
                    error_text: e.to_string(),
                };
                Poll::Ready(Some(UiEvent::Part(part)))
            }

            Poll::Pending => Poll::Pending,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
