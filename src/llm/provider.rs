//! The provider generation capability.

use async_trait::async_trait;

use super::error::LlmError;
use super::types::{EventStream, GenerateRequest, GenerateResult};

/// Trait for hosted-model provider clients.
///
/// Every client exposes the same two capabilities: a single-shot generation
/// that may carry binary file outputs, and a native incremental token
/// stream. The dispatcher picks one per request; the clients stay
/// interchangeable behind this trait.
#[async_trait]
pub trait GenerateProvider: Send + Sync {
    /// Perform a one-shot generation, awaited to completion.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResult, LlmError>;

    /// Start an incremental generation and return its token stream.
    async fn generate_stream(&self, request: GenerateRequest) -> Result<EventStream, LlmError>;
}
