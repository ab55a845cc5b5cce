//! Provider clients for hosted model generation.

pub mod data_url;
mod error;
mod google;
mod openai;
mod provider;
mod registry;
mod types;
mod vertex;

pub use error::LlmError;
pub use google::GoogleProvider;
pub use openai::OpenAiCompatibleProvider;
pub use provider::GenerateProvider;
pub use registry::{CatalogEntry, MODEL_CATALOG, ModelRoute, ProviderRegistry, route_for};
pub use types::{
    AspectRatio, ChatMessage, EventStream, GenerateRequest, GenerateResult, GeneratedFile,
    MessagePart, Role, StreamEvent,
};
pub use vertex::{DEFAULT_LOCATION as VERTEX_DEFAULT_LOCATION, ServiceAccountKey, VertexProvider};
