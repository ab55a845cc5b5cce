//! Common types for provider generation requests and streams.

use std::pin::Pin;

use serde::{Deserialize, Serialize};

use super::error::LlmError;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a chat conversation, as produced by the client UI.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

/// A typed part of a chat message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text {
        text: String,
    },
    /// A file attachment carried inline as a data URL.
    File {
        url: String,
        #[serde(rename = "mediaType")]
        media_type: String,
    },
}

/// Aspect ratio tokens accepted for image generation.
///
/// The token is passed through to the image provider verbatim; this
/// enumeration is the only validation applied.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    PortraitTwoThree,
    #[serde(rename = "3:2")]
    LandscapeThreeTwo,
    #[serde(rename = "3:4")]
    PortraitThreeFour,
    #[serde(rename = "4:3")]
    LandscapeFourThree,
    #[serde(rename = "4:5")]
    PortraitFourFive,
    #[serde(rename = "5:4")]
    LandscapeFiveFour,
    #[serde(rename = "9:16")]
    PortraitNineSixteen,
    #[serde(rename = "16:9")]
    LandscapeSixteenNine,
    #[serde(rename = "21:9")]
    UltrawideTwentyOneNine,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::PortraitTwoThree => "2:3",
            AspectRatio::LandscapeThreeTwo => "3:2",
            AspectRatio::PortraitThreeFour => "3:4",
            AspectRatio::LandscapeFourThree => "4:3",
            AspectRatio::PortraitFourFive => "4:5",
            AspectRatio::LandscapeFiveFour => "5:4",
            AspectRatio::PortraitNineSixteen => "9:16",
            AspectRatio::LandscapeSixteenNine => "16:9",
            AspectRatio::UltrawideTwentyOneNine => "21:9",
        }
    }
}

/// A generation request handed to a provider client.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Present only on the image-generation path.
    pub aspect_ratio: Option<AspectRatio>,
}

/// A completed one-shot generation: optional text plus any generated files.
#[derive(Debug, Clone, Default)]
pub struct GenerateResult {
    pub text: String,
    pub files: Vec<GeneratedFile>,
}

/// A binary output from a one-shot generation, kept base64-encoded as the
/// provider delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub media_type: String,
    pub base64: String,
}

/// An incremental event from a provider's native token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Token(String),
    Done,
}

/// A boxed provider token stream.
pub type EventStream = Pin<Box<dyn futures::Stream<Item = Result<StreamEvent, LlmError>> + Send>>;
