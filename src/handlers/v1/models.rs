//! Model catalog HTTP handler.

use axum::Json;
use serde::Serialize;

use crate::llm::MODEL_CATALOG;

#[derive(Serialize)]
pub struct ListModelsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Serialize)]
pub struct ModelInfo {
    id: &'static str,
    name: &'static str,
}

/// GET /api/v1/models
///
/// The identifier/display-name pairs the UI offers for selection. Derived
/// from the same table the dispatcher routes by, so the two stay consistent.
pub async fn list_models() -> Json<ListModelsResponse> {
    let models = MODEL_CATALOG
        .iter()
        .map(|entry| ModelInfo {
            id: entry.id,
            name: entry.name,
        })
        .collect();

    Json(ListModelsResponse { models })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catalog_listing() {
        let Json(response) = list_models().await;
        let json = serde_json::to_value(&response).unwrap();

        let models = json["models"].as_array().unwrap();
        assert_eq!(models.len(), MODEL_CATALOG.len());
        assert_eq!(models[0]["id"], "models/gemini-3-flash-preview");
        assert_eq!(models[0]["name"], "Gemini 3 Flash");
    }
}
