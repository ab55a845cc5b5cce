//! Google Generative Language API provider (API-key auth).
//!
//! Serves both generation modes: one-shot `generateContent` (used for
//! image-capable models, requesting TEXT and IMAGE response modalities) and
//! incremental `streamGenerateContent` over SSE.

use async_trait::async_trait;
use reqwest::Client;

use super::data_url;
use super::error::LlmError;
use super::provider::GenerateProvider;
use super::types::{
    EventStream, GenerateRequest, GenerateResult, GeneratedFile, MessagePart, Role, StreamEvent,
};

/// Google Generative Language API client.
pub struct GoogleProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoogleProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl GenerateProvider for GoogleProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResult, LlmError> {
        // Model identifiers from the catalog already carry the "models/"
        // prefix expected by the v1beta path.
        let url = format!("{}/v1beta/{}:generateContent", self.base_url, request.model);
        let body = to_gemini_request(&request);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        Ok(from_gemini_response(gemini_response))
    }

    async fn generate_stream(&self, request: GenerateRequest) -> Result<EventStream, LlmError> {
        let url = format!(
            "{}/v1beta/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );
        let body = to_gemini_request(&request);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

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

// --- Gemini wire types (shared with the Vertex provider) ---

#[derive(Debug, serde::Serialize)]
pub(super) struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(super) struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub(super) struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiBlob>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(super) struct GeminiBlob {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, serde::Serialize)]
pub(super) struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    pub response_modalities: Vec<&'static str>,
    #[serde(rename = "imageConfig")]
    pub image_config: ImageConfig,
}

#[derive(Debug, serde::Serialize)]
pub(super) struct ImageConfig {
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: String,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

pub(super) fn to_gemini_request(request: &GenerateRequest) -> GeminiRequest {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for message in &request.messages {
        let mut parts = Vec::new();
        for part in &message.parts {
            match part {
                MessagePart::Text { text } => parts.push(GeminiPart {
                    text: Some(text.clone()),
                    ..Default::default()
                }),
                MessagePart::File { url, .. } => {
                    // Attachments arrive as data URLs; anything else is
                    // dropped rather than rejected.
                    if let Some((mime_type, data)) = data_url::parse(url) {
                        parts.push(GeminiPart {
                            inline_data: Some(GeminiBlob { mime_type, data }),
                            ..Default::default()
                        });
                    }
                }
            }
        }
        if parts.is_empty() {
            continue;
        }

        match message.role {
            Role::System => system_parts.extend(parts),
            Role::User => contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts,
            }),
            Role::Assistant => contents.push(GeminiContent {
                role: Some("model".to_string()),
                parts,
            }),
        }
    }

    let generation_config = request.aspect_ratio.map(|ratio| GenerationConfig {
        response_modalities: vec!["TEXT", "IMAGE"],
        image_config: ImageConfig {
            aspect_ratio: ratio.as_str().to_string(),
        },
    });

    GeminiRequest {
        contents,
        system_instruction: (!system_parts.is_empty()).then(|| GeminiContent {
            role: None,
            parts: system_parts,
        }),
        generation_config,
    }
}

pub(super) fn from_gemini_response(response: GeminiResponse) -> GenerateResult {
    let mut result = GenerateResult::default();

    let Some(content) = response.candidates.into_iter().next().and_then(|c| c.content) else {
        return result;
    };

    for part in content.parts {
        if let Some(text) = part.text {
            result.text.push_str(&text);
        }
        if let Some(blob) = part.inline_data {
            result.files.push(GeneratedFile {
                media_type: blob.mime_type,
                base64: blob.data,
            });
        }
    }

    result
}

/// Joined text of the first candidate in a streamed chunk.
fn chunk_text(chunk: &GeminiResponse) -> Option<String> {
    let content = chunk.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    (!text.is_empty()).then_some(text)
}

// --- Streaming ---

pub(super) struct StreamParser<S> {
    inner: S,
    buffer: bytes::BytesMut,
    eof: bool,
    done: bool,
}

impl<S> StreamParser<S> {
    pub(super) fn new(inner: S) -> Self {
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

                // The Gemini SSE stream has no [DONE] marker; it simply ends.
                if let Some(data) = line.strip_prefix("data: ")
                    && let Ok(chunk) = serde_json::from_str::<GeminiResponse>(data)
                    && let Some(text) = chunk_text(&chunk)
                {
                    return Poll::Ready(Some(Ok(StreamEvent::Token(text))));
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
                    // Flush a trailing line that arrived without a newline.
                    if !self.buffer.is_empty() {
                        self.buffer.extend_from_slice(b"\n");
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{AspectRatio, ChatMessage};
    use futures::StreamExt;

    fn user_text(text: &str) -> ChatMessage {
        ChatMessage {
            role: Role::User,
            parts: vec![MessagePart::Text {
                text: text.to_string(),
            }],
        }
    }

    #[test]
    fn test_request_carries_aspect_ratio_verbatim() {
        let request = GenerateRequest {
            model: "models/gemini-2.5-flash-image".to_string(),
            messages: vec![user_text("draw a cat")],
            aspect_ratio: Some(AspectRatio::LandscapeSixteenNine),
        };

        let json = serde_json::to_value(to_gemini_request(&request)).unwrap();
        assert_eq!(
            json["generationConfig"]["imageConfig"]["aspectRatio"],
            "16:9"
        );
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );
    }

    #[test]
    fn test_request_without_aspect_ratio_has_no_generation_config() {
        let request = GenerateRequest {
            model: "models/gemini-3-flash-preview".to_string(),
            messages: vec![user_text("hello")],
            aspect_ratio: None,
        };

        let json = serde_json::to_value(to_gemini_request(&request)).unwrap();
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_request_roles_and_system_instruction() {
        let request = GenerateRequest {
            model: "models/gemini-3-pro-preview".to_string(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    parts: vec![MessagePart::Text {
                        text: "be brief".to_string(),
                    }],
                },
                user_text("hi"),
                ChatMessage {
                    role: Role::Assistant,
                    parts: vec![MessagePart::Text {
                        text: "hello".to_string(),
                    }],
                },
            ],
            aspect_ratio: None,
        };

        let json = serde_json::to_value(to_gemini_request(&request)).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
    }

    #[test]
    fn test_request_forwards_data_url_attachment_as_inline_data() {
        let request = GenerateRequest {
            model: "models/gemini-3-flash-preview".to_string(),
            messages: vec![ChatMessage {
                role: Role::User,
                parts: vec![
                    MessagePart::Text {
                        text: "what is this?".to_string(),
                    },
                    MessagePart::File {
                        url: "data:image/png;base64,aGk=".to_string(),
                        media_type: "image/png".to_string(),
                    },
                ],
            }],
            aspect_ratio: None,
        };

        let json = serde_json::to_value(to_gemini_request(&request)).unwrap();
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "aGk=");
    }

    #[test]
    fn test_response_with_text_and_images() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "here is your cat"},
                        {"inlineData": {"mimeType": "image/png", "data": "cGF3cw=="}}
                    ]
                }
            }]
        }"#;

        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let result = from_gemini_response(response);
        assert_eq!(result.text, "here is your cat");
        assert_eq!(
            result.files,
            vec![GeneratedFile {
                media_type: "image/png".to_string(),
                base64: "cGF3cw==".to_string(),
            }]
        );
    }

    #[test]
    fn test_response_without_candidates_is_empty() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        let result = from_gemini_response(response);
        assert!(result.text.is_empty());
        assert!(result.files.is_empty());
    }

    fn byte_stream(
        chunks: Vec<&'static str>,
    ) -> impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Unpin {
        futures::stream::iter(chunks.into_iter().map(|c| Ok(bytes::Bytes::from(c))))
    }

    #[tokio::test]
    async fn test_stream_parser_extracts_tokens() {
        let parser = StreamParser::new(byte_stream(vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\n\n",
        ]));

        let events: Vec<_> = parser.collect().await;
        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Token("Hel".to_string()),
                StreamEvent::Token("lo".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_parser_handles_lines_split_across_chunks() {
        let parser = StreamParser::new(byte_stream(vec![
            "data: {\"candidates\":[{\"content\":",
            "{\"parts\":[{\"text\":\"chunked\"}]}}]}\n\n",
        ]));

        let events: Vec<_> = parser.collect().await;
        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![StreamEvent::Token("chunked".to_string()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn test_stream_parser_keeps_multibyte_char_split_across_chunks() {
        let payload =
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"café\"}]}}]}\n\n"
                .as_bytes();
        // Split between the two bytes of the 'é'.
        let split = payload.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let parser = StreamParser::new(futures::stream::iter(vec![
            Ok::<_, reqwest::Error>(bytes::Bytes::copy_from_slice(&payload[..split])),
            Ok(bytes::Bytes::copy_from_slice(&payload[split..])),
        ]));

        let events: Vec<_> = parser.collect().await;
        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![StreamEvent::Token("café".to_string()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn test_stream_parser_flushes_trailing_line_without_newline() {
        let parser = StreamParser::new(byte_stream(vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"tail\"}]}}]}",
        ]));

        let events: Vec<_> = parser.collect().await;
        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![StreamEvent::Token("tail".to_string()), StreamEvent::Done]
        );
    }
}
