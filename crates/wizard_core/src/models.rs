use shared::domain::{default_models, ModelDescriptor};
use tracing::warn;

use crate::api::AnalysisApi;

/// Model choices for the confirmation screen. Falls back to the built-in list
/// when the backend cannot be reached or returns nothing usable.
pub async fn fetch_models(api: &dyn AnalysisApi) -> Vec<ModelDescriptor> {
    match api.models().await {
        Ok(envelope) if !envelope.data.is_empty() => envelope.data,
        Ok(_) => {
            warn!("models: backend returned an empty list; using defaults");
            default_models()
        }
        Err(error) => {
            warn!(%error, "models: fetch failed; using defaults");
            default_models()
        }
    }
}

/// Looks up a model's display entry, if the id is known.
pub fn find_model<'a>(models: &'a [ModelDescriptor], id: &str) -> Option<&'a ModelDescriptor> {
    models.iter().find(|model| model.id == id)
}
