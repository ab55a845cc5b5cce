//! Provider registry and model catalog.
//!
//! One static table drives both the client-facing model catalog and the
//! dispatch routing, so the two can never drift apart.

use std::sync::Arc;

use tracing::info;

use super::google::GoogleProvider;
use super::openai::OpenAiCompatibleProvider;
use super::provider::GenerateProvider;
use super::vertex::VertexProvider;
use crate::config::Credentials;

/// Which preconfigured client serves a model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRoute {
    /// Direct API-key client (Generative Language API).
    Google,
    /// OpenAI-compatible client fronting third-party hosted models.
    VertexThirdParty,
    /// Cloud-IAM client; also the fallback for unknown identifiers.
    Vertex,
}

/// A model offered to the client UI.
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub route: ModelRoute,
}

/// Every model the UI offers, with the client that serves it.
pub const MODEL_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "models/gemini-3-flash-preview",
        name: "Gemini 3 Flash",
        route: ModelRoute::Google,
    },
    CatalogEntry {
        id: "models/gemini-3-pro-preview",
        name: "Gemini 3 Pro",
        route: ModelRoute::Google,
    },
    CatalogEntry {
        id: "models/gemini-2.5-flash-image",
        name: "Gemini 2.5 Flash Image",
        route: ModelRoute::Google,
    },
    CatalogEntry {
        id: "minimaxai/minimax-m2-maas",
        name: "MiniMax M2",
        route: ModelRoute::VertexThirdParty,
    },
    CatalogEntry {
        id: "moonshotai/kimi-k2-thinking-maas",
        name: "Kimi K2 Thinking",
        route: ModelRoute::VertexThirdParty,
    },
];

/// Resolve the route for a model identifier.
///
/// Identifiers absent from the catalog fall through to the Vertex client
/// with no existence validation; the upstream call surfaces any mismatch.
pub fn route_for(model: &str) -> ModelRoute {
    MODEL_CATALOG
        .iter()
        .find(|entry| entry.id == model)
        .map(|entry| entry.route)
        .unwrap_or(ModelRoute::Vertex)
}

/// The three preconfigured provider clients, constructed once at process
/// entry and cloned into per-request state.
#[derive(Clone)]
pub struct ProviderRegistry {
    google: Arc<dyn GenerateProvider>,
    vertex: Arc<dyn GenerateProvider>,
    openai_compatible: Arc<dyn GenerateProvider>,
}

impl ProviderRegistry {
    pub fn new(
        google: Arc<dyn GenerateProvider>,
        vertex: Arc<dyn GenerateProvider>,
        openai_compatible: Arc<dyn GenerateProvider>,
    ) -> Self {
        Self {
            google,
            vertex,
            openai_compatible,
        }
    }

    /// Build the three clients from loaded credentials.
    pub fn from_credentials(credentials: Credentials) -> Self {
        let google = GoogleProvider::new(
            credentials.google_api_key,
            GoogleProvider::DEFAULT_BASE_URL.to_string(),
        );
        info!("Registered Google Generative Language provider");

        let vertex = VertexProvider::new(
            credentials.service_account,
            credentials.vertex_location.clone(),
        );
        info!(location = %credentials.vertex_location, "Registered Vertex AI provider");

        let openai_compatible = OpenAiCompatibleProvider::new(
            credentials.openai_base_url.clone(),
            credentials.openai_api_key,
        );
        info!(base_url = %credentials.openai_base_url, "Registered OpenAI-compatible provider");

        Self::new(Arc::new(google), Arc::new(vertex), Arc::new(openai_compatible))
    }

    /// The client that must handle a model identifier.
    pub fn route(&self, model: &str) -> Arc<dyn GenerateProvider> {
        match route_for(model) {
            ModelRoute::Google => self.google.clone(),
            ModelRoute::VertexThirdParty => self.openai_compatible.clone(),
            ModelRoute::Vertex => self.vertex.clone(),
        }
    }

    /// The fixed image-capable client.
    pub fn image(&self) -> Arc<dyn GenerateProvider> {
        self.google.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::error::LlmError;
    use crate::llm::types::{EventStream, GenerateRequest, GenerateResult};
    use async_trait::async_trait;

    struct StubProvider;

    #[async_trait]
    impl GenerateProvider for StubProvider {
        async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResult, LlmError> {
            Ok(GenerateResult::default())
        }

        async fn generate_stream(
            &self,
            _request: GenerateRequest,
        ) -> Result<EventStream, LlmError> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    fn stub_registry() -> ProviderRegistry {
        ProviderRegistry::new(
            Arc::new(StubProvider),
            Arc::new(StubProvider),
            Arc::new(StubProvider),
        )
    }

    #[test]
    fn test_google_models_route_to_google() {
        for id in [
            "models/gemini-3-flash-preview",
            "models/gemini-3-pro-preview",
            "models/gemini-2.5-flash-image",
        ] {
            assert_eq!(route_for(id), ModelRoute::Google, "{id}");
        }
    }

    #[test]
    fn test_third_party_models_route_to_openai_compatible() {
        for id in ["minimaxai/minimax-m2-maas", "moonshotai/kimi-k2-thinking-maas"] {
            assert_eq!(route_for(id), ModelRoute::VertexThirdParty, "{id}");
        }
    }

    #[test]
    fn test_unknown_model_falls_back_to_vertex() {
        assert_eq!(route_for("unknown-model-id"), ModelRoute::Vertex);
        assert_eq!(route_for(""), ModelRoute::Vertex);
    }

    #[test]
    fn test_registry_resolves_clients_by_route() {
        let registry = stub_registry();

        let google = registry.route("models/gemini-3-flash-preview");
        assert!(Arc::ptr_eq(&google, &registry.google));

        let third_party = registry.route("minimaxai/minimax-m2-maas");
        assert!(Arc::ptr_eq(&third_party, &registry.openai_compatible));

        let fallback = registry.route("unknown-model-id");
        assert!(Arc::ptr_eq(&fallback, &registry.vertex));
    }

    #[test]
    fn test_image_client_is_google() {
        let registry = stub_registry();
        assert!(Arc::ptr_eq(&registry.image(), &registry.google));
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        for (i, a) in MODEL_CATALOG.iter().enumerate() {
            for b in &MODEL_CATALOG[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }
}
