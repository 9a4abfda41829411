//! Fabricated payloads for the simulated backend.

use chrono::{DateTime, Utc};
use rand::Rng;
use shared::{
    domain::{Classification, DEFAULT_MODEL_ID},
    protocol::{GradcamData, ModelMetrics, PredictData, ReportData, SegmentData},
};

pub const PLACEHOLDER_MASK_URL: &str = "/api/placeholder-mask";
pub const PLACEHOLDER_GRADCAM_URL: &str = "/api/placeholder-gradcam";
pub const PLACEHOLDER_PDF_URL: &str = "/api/placeholder-pdf";

pub fn segmentation() -> SegmentData {
    SegmentData {
        mask_url: PLACEHOLDER_MASK_URL.to_string(),
        confidence: 0.87,
        processing_time: Some("2.3s".to_string()),
    }
}

pub fn prediction<R: Rng + ?Sized>(rng: &mut R, model: Option<&str>) -> PredictData {
    let classification = if rng.random_bool(0.5) {
        Classification::Normal
    } else {
        Classification::Pathological
    };
    PredictData {
        classification,
        confidence: round3(0.7 + rng.random::<f64>() * 0.3),
        processing_time: Some("1.8s".to_string()),
        model_used: Some(model.unwrap_or(DEFAULT_MODEL_ID).to_string()),
    }
}

pub fn gradcam() -> GradcamData {
    GradcamData {
        gradcam_url: PLACEHOLDER_GRADCAM_URL.to_string(),
        heatmap_intensity: Some("high".to_string()),
        focus_areas: vec!["cortex".to_string(), "medulla".to_string()],
    }
}

pub fn metrics<R: Rng + ?Sized>(rng: &mut R) -> ModelMetrics {
    let mut sample = |base: f64, spread: f64| format!("{:.3}", base + rng.random::<f64>() * spread);
    ModelMetrics {
        accuracy: sample(0.9, 0.1),
        precision: sample(0.85, 0.1),
        recall: sample(0.88, 0.1),
        f1_score: sample(0.87, 0.1),
        auc: sample(0.92, 0.05),
    }
}

pub fn report(now: DateTime<Utc>) -> ReportData {
    ReportData {
        pdf_url: PLACEHOLDER_PDF_URL.to_string(),
        filename: report_filename(now),
        size: Some("2.4 MB".to_string()),
    }
}

pub fn report_filename(now: DateTime<Utc>) -> String {
    format!("renal_analysis_{}.pdf", now.timestamp_millis())
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
