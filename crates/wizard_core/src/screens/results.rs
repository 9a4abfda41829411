use chrono::Utc;
use shared::{
    domain::{Classification, WizardStep},
    protocol::{ReportData, ReportRequest},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{api::AnalysisApi, controller::WizardController};

/// Used when the record has no usable confidence (missing, zero or NaN).
pub const DEFAULT_CONFIDENCE: f64 = 0.85;
pub const REPORT_SUCCESS_MESSAGE: &str =
    "PDF report generated successfully. A production deployment would download it automatically.";

/// The one failure the wizard surfaces as a blocking alert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportAlert {
    #[error("A classification is required before generating a report.")]
    NotReady,
    #[error("{0}")]
    Backend(String),
    #[error("Error generating the PDF. A production deployment would offer an alternative download link.")]
    Unreachable,
}

/// Everything the results screen displays, derived from the record.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub headline: &'static str,
    pub is_normal: bool,
    pub confidence_percent: String,
    pub interpretation: &'static str,
    pub metric_rows: Vec<(String, String)>,
    pub model_name: String,
    pub gradcam_url: Option<String>,
    pub warnings: Vec<String>,
}

impl ResultsView {
    pub fn from_controller(controller: &WizardController) -> Self {
        let record = controller.record();
        Self {
            headline: headline(record.classification),
            is_normal: is_normal(record.classification),
            confidence_percent: confidence_percent(record.confidence),
            interpretation: interpretation(record.classification, record.confidence),
            metric_rows: metric_rows(&record.metrics),
            model_name: model_display_name(controller.selected_model()),
            gradcam_url: record.gradcam_url.clone(),
            warnings: record.all_warnings(),
        }
    }
}

fn is_normal(label: Option<Classification>) -> bool {
    label.is_some_and(Classification::is_normal)
}

fn effective_percent(confidence: Option<f64>) -> f64 {
    confidence
        .filter(|value| *value > 0.0)
        .unwrap_or(DEFAULT_CONFIDENCE)
        * 100.0
}

pub fn headline(label: Option<Classification>) -> &'static str {
    if is_normal(label) {
        "Normal structure"
    } else {
        "Abnormalities detected"
    }
}

pub fn confidence_percent(confidence: Option<f64>) -> String {
    format!("{:.1}%", effective_percent(confidence))
}

pub fn interpretation(label: Option<Classification>, confidence: Option<f64>) -> &'static str {
    let percent = effective_percent(confidence);
    match (is_normal(label), percent) {
        (true, p) if p > 90.0 => {
            "The ultrasound findings suggest a renal structure within normal parameters. Routine follow-up is recommended."
        }
        (true, p) if p > 80.0 => {
            "The findings are compatible with normality, although a complementary clinical evaluation is suggested."
        }
        (true, _) => "The findings require additional clinical interpretation to confirm normality.",
        (false, p) if p > 90.0 => {
            "Significant alterations in the renal structure were identified that require immediate clinical evaluation."
        }
        (false, p) if p > 80.0 => {
            "Findings suggesting possible renal alterations were observed. Clinical correlation is recommended."
        }
        (false, _) => {
            "The findings require a detailed clinical evaluation to determine their significance."
        }
    }
}

/// `f1Score` becomes `F1 Score`.
pub fn metric_label(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(ch);
    }
    capitalize_words(spaced.split_whitespace())
}

pub fn metric_rows(metrics: &[(String, String)]) -> Vec<(String, String)> {
    metrics
        .iter()
        .map(|(key, value)| (metric_label(key), value.clone()))
        .collect()
}

/// `mobilenetv2_default` becomes `Mobilenetv2 Default`.
pub fn model_display_name(model_id: &str) -> String {
    capitalize_words(model_id.split(|c: char| c == '_' || c.is_whitespace()).filter(|w| !w.is_empty()))
}

fn capitalize_words<'a>(words: impl Iterator<Item = &'a str>) -> String {
    words
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn can_request_report(controller: &WizardController) -> bool {
    controller.record().classification.is_some()
}

pub async fn request_report(
    api: &dyn AnalysisApi,
    controller: &WizardController,
) -> Result<ReportData, ReportAlert> {
    if !can_request_report(controller) {
        return Err(ReportAlert::NotReady);
    }
    let request = ReportRequest {
        analysis_data: controller.record().summary(),
        selected_model: controller.selected_model().to_string(),
        timestamp: Utc::now(),
    };
    match api.generate_report(&request).await {
        Ok(envelope) if envelope.error => {
            warn!(message = %envelope.message, "results: report generation reported an error");
            Err(ReportAlert::Backend(envelope.message))
        }
        Ok(envelope) => {
            info!(pdf_url = %envelope.data.pdf_url, filename = %envelope.data.filename, "results: report ready");
            Ok(envelope.data)
        }
        Err(error) => {
            warn!(%error, "results: report request failed");
            Err(ReportAlert::Unreachable)
        }
    }
}

pub fn back(controller: &mut WizardController) {
    controller.go_to_step(WizardStep::Confirmation);
}

pub fn restart(controller: &mut WizardController) {
    controller.restart();
}

#[cfg(test)]
#[path = "tests/results_tests.rs"]
mod tests;
