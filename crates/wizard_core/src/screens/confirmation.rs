use rand::Rng;
use shared::{
    domain::{Classification, ModelDescriptor, WizardStep},
    protocol::ModelMetrics,
};
use tracing::{info, warn};

use crate::{
    api::{AnalysisApi, AnalysisUpload},
    controller::WizardController,
    error::ClientError,
    models::{fetch_models, find_model},
    record::{RecordPatch, PLACEHOLDER_GRADCAM},
};

pub const CONNECTION_WARNING: &str =
    "Connection error during classification. Showing simulated results.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Every backend call answered; some answers may carry warnings.
    Completed,
    /// At least one call could not be made; local substitutes were shown.
    Simulated,
}

/// Values shown when the backend cannot be reached.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedResults {
    pub classification: Classification,
    pub confidence: f64,
    pub gradcam_url: String,
    pub metrics: ModelMetrics,
}

impl SimulatedResults {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let classification = if rng.random_bool(0.5) {
            Classification::Normal
        } else {
            Classification::Pathological
        };
        Self {
            classification,
            confidence: 0.7 + rng.random::<f64>() * 0.3,
            gradcam_url: PLACEHOLDER_GRADCAM.to_string(),
            metrics: ModelMetrics::illustrative(),
        }
    }

    fn into_patch(self) -> RecordPatch {
        RecordPatch {
            classification: Some(self.classification),
            confidence: Some(self.confidence),
            gradcam_url: Some(self.gradcam_url),
            metrics: Some(self.metrics.into_entries()),
            ..RecordPatch::default()
        }
    }
}

pub struct ConfirmationScreen {
    models: Vec<ModelDescriptor>,
}

impl ConfirmationScreen {
    pub async fn open(api: &dyn AnalysisApi) -> Self {
        Self {
            models: fetch_models(api).await,
        }
    }

    pub fn with_models(models: Vec<ModelDescriptor>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    /// Unknown ids leave the current choice in place.
    pub fn select_model(&self, controller: &mut WizardController, model_id: &str) -> bool {
        match find_model(&self.models, model_id) {
            Some(model) => {
                info!(model = %model.id, "confirmation: model selected");
                controller.select_model(model.id.clone());
                true
            }
            None => {
                controller.add_warning(format!("Unknown model '{model_id}'"));
                false
            }
        }
    }

    /// Runs predict, gradcam and metrics, then always moves to Results.
    pub async fn classify(
        &self,
        api: &dyn AnalysisApi,
        controller: &mut WizardController,
    ) -> ConfirmationOutcome {
        let fallback = SimulatedResults::generate(&mut rand::rng());
        classify_with_fallback(api, controller, fallback).await
    }

    pub fn back(&self, controller: &mut WizardController) {
        controller.go_to_step(WizardStep::MaskEdit);
    }
}

/// Classification flow with the substitute values supplied up front.
pub async fn classify_with_fallback(
    api: &dyn AnalysisApi,
    controller: &mut WizardController,
    fallback: SimulatedResults,
) -> ConfirmationOutcome {
    let mut warnings = Vec::new();
    let outcome = match request_results(api, controller, &mut warnings).await {
        Ok(patch) => {
            controller.update_record(patch);
            ConfirmationOutcome::Completed
        }
        Err(error) => {
            warn!(%error, "confirmation: backend unreachable; using simulated results");
            warnings.push(CONNECTION_WARNING.to_string());
            controller.update_record(fallback.into_patch());
            ConfirmationOutcome::Simulated
        }
    };
    for message in &warnings {
        controller.add_warning(message.clone());
    }
    controller.update_record(RecordPatch {
        classification_warnings: Some(warnings),
        ..RecordPatch::default()
    });
    info!(
        ?outcome,
        classification = ?controller.record().classification,
        confidence = ?controller.record().confidence,
        "confirmation: classification finished"
    );
    controller.go_to_step(WizardStep::Results);
    outcome
}

async fn request_results(
    api: &dyn AnalysisApi,
    controller: &WizardController,
    warnings: &mut Vec<String>,
) -> Result<RecordPatch, ClientError> {
    let upload = AnalysisUpload::from_record(controller.record(), Some(controller.selected_model()))?;

    let prediction = api.predict(upload.clone()).await?;
    if prediction.error {
        warnings.push(prediction.message);
    }

    let gradcam = api.gradcam(upload).await?;
    if gradcam.error {
        warnings.push(gradcam.message);
    }

    let metrics = api.model_metrics().await?;
    if metrics.error {
        warnings.push(metrics.message);
    }

    Ok(RecordPatch {
        classification: Some(prediction.data.classification),
        confidence: Some(normalize_confidence(prediction.data.confidence)),
        gradcam_url: Some(gradcam.data.gradcam_url),
        metrics: Some(metrics.data.into_entries()),
        ..RecordPatch::default()
    })
}

pub fn normalize_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
#[path = "tests/confirmation_tests.rs"]
mod tests;
