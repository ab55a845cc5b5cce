//! OpenAI-compatible provider.
//!
//! Serves any endpoint speaking the `/chat/completions` schema; the gateway
//! points it at the OpenAI-compatible front for third-party hosted models.

use async_trait::async_trait;
use reqwest::Client;

use super::error::LlmError;
use super::provider::GenerateProvider;
use super::types::{
    ChatMessage, EventStream, GenerateRequest, GenerateResult, MessagePart, Role, StreamEvent,
};

/// OpenAI-compatible provider.
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        req
    }
}

#[async_trait]
impl GenerateProvider for OpenAiCompatibleProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResult, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Request {
            model: request.model,
            messages: to_messages(&request.messages),
        };

        let response = self.request_builder(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let completion: ChatResponse = response.json().await?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        // Chat completions never carry binary outputs.
        Ok(GenerateResult {
            text,
            files: Vec::new(),
        })
    }

    async fn generate_stream(&self, request: GenerateRequest) -> Result<EventStream, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = StreamRequest {
            model: request.model,
            messages: to_messages(&request.messages),
            stream: true,
        };

        let response = self.request_builder(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let byte_stream = response.bytes_stream();
        let event_stream = StreamParser::new(byte_stream);

        Ok(Box::pin(event_stream))
    }
}

// --- Request/response types ---

#[derive(serde::Serialize)]
struct Request {
    model: String,
    messages: Vec<Message>,
}

#[derive(serde::Serialize)]
struct StreamRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(serde::Serialize)]
struct Message {
    role: Role,
    content: Content,
}

#[derive(serde::Serialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(serde::Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(serde::Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn to_messages(messages: &[ChatMessage]) -> Vec<Message> {
    messages
        .iter()
        .map(|message| {
            let has_files = message
                .parts
                .iter()
                .any(|p| matches!(p, MessagePart::File { .. }));

            let content = if has_files {
                Content::Parts(
                    message
                        .parts
                        .iter()
                        .map(|part| match part {
                            MessagePart::Text { text } => ContentPart::Text { text: text.clone() },
                            MessagePart::File { url, .. } => ContentPart::ImageUrl {
                                image_url: ImageUrl { url: url.clone() },
                            },
                        })
                        .collect(),
                )
            } else {
                Content::Text(
                    message
                        .parts
                        .iter()
                        .filter_map(|part| match part {
                            MessagePart::Text { text } => Some(text.as_str()),
                            MessagePart::File { .. } => None,
                        })
                        .collect::<Vec<_>>()
                        .join("\n"),
                )
            };

            Message {
                role: message.role,
                content,
            }
        })
        .collect()
}

// --- Streaming ---

struct StreamParser<S> {
    inner: S,
    buffer: bytes::BytesMut,
    eof: bool,
    done: bool,
}

impl<S> StreamParser<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: bytes::BytesMut::new(),
            eof: false,
            done: false,
        }
    }
}

impl<S> futures::Stream for StreamParser<S>
where
    S: futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Unpin,
{
    type Item = Result<StreamEvent, LlmError>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        if self.done {
            return Poll::Ready(None);
        }

        loop {
            // Bytes are buffered raw and decoded per line, so a multi-byte
            // character split across network chunks stays intact.
            if let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
                let raw = self.buffer.split_to(line_end + 1);
                let Ok(line) = std::str::from_utf8(&raw[..line_end]) else {
                    continue;
                };
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                if let Some(data) = line.strip_prefix("data: ") {
                    if data == "[DONE]" {
                        self.done = true;
                        return Poll::Ready(Some(Ok(StreamEvent::Done)));
                    }

                    if let Ok(chunk) = serde_json::from_str::<StreamChunk>(data)
                        && let Some(choice) = chunk.choices.first()
                        && let Some(ref content) = choice.delta.content
                        && !content.is_empty()
                    {
                        return Poll::Ready(Some(Ok(StreamEvent::Token(content.clone()))));
                    }
                }
                continue;
            }

            if self.eof {
                self.done = true;
                return Poll::Ready(Some(Ok(StreamEvent::Done)));
            }

            // Need more data
            match std::pin::Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    self.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(LlmError::Request(e))));
                }
                Poll::Ready(None) => {
                    self.eof = true;
                    if !self.buffer.is_empty() {
                        self.buffer.extend_from_slice(b"\n");
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[derive(serde::Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(serde::Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(serde::Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
