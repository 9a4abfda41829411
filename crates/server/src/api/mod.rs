use chrono::Utc;
use rand::Rng;
use shared::{
    domain::{default_models, ModelDescriptor},
    protocol::{
        Envelope, GradcamData, ModelMetrics, PredictData, ReportData, ReportRequest, SegmentData,
    },
};
use tracing::{error, info, warn};

use crate::{
    scripts::{ScriptError, ScriptRunner},
    simulate,
    uploads::{AnalysisForm, StoredUpload, UploadStore},
};

pub const OP_SEGMENT: &str = "Automatic segmentation";
pub const OP_PREDICT: &str = "Classification";
pub const OP_GRADCAM: &str = "Grad-CAM generation";
pub const OP_REPORT: &str = "PDF report generation";
pub const OP_METRICS: &str = "Metrics retrieval";

/// Everything a request handler needs; cloned into each request.
#[derive(Clone)]
pub struct ApiContext {
    pub uploads: UploadStore,
    /// Present when the backend relays the placeholder scripts.
    pub scripts: Option<ScriptRunner>,
    pub failure_rate: f64,
}

pub fn success_message(operation: &str) -> String {
    format!("{operation} completed successfully")
}

pub fn failure_message(operation: &str) -> String {
    format!(
        "Could not complete {}. Continuing with simulated data to keep the workflow going.",
        operation.to_lowercase()
    )
}

/// Wraps simulated data, failing at random with probability `failure_rate`.
/// The data is carried either way.
pub fn safe_envelope<T, R: Rng + ?Sized>(
    rng: &mut R,
    failure_rate: f64,
    operation: &str,
    data: T,
) -> Envelope<T> {
    if rng.random_bool(failure_rate.clamp(0.0, 1.0)) {
        error!(operation, "simulated processing error");
        Envelope::simulated_failure(failure_message(operation), data)
    } else {
        Envelope::ok(success_message(operation), data)
    }
}

fn script_failure<T>(operation: &str, err: &ScriptError, fallback: T) -> Envelope<T> {
    warn!(operation, error = %err, "script invocation failed; returning simulated data");
    Envelope::simulated_failure(failure_message(operation), fallback)
}

pub fn list_models() -> Envelope<Vec<ModelDescriptor>> {
    Envelope::ok("Available models retrieved successfully", default_models())
}

pub fn model_metrics(ctx: &ApiContext) -> Envelope<ModelMetrics> {
    let mut rng = rand::rng();
    let data = simulate::metrics(&mut rng);
    safe_envelope(&mut rng, ctx.failure_rate, OP_METRICS, data)
}

pub fn gradcam(ctx: &ApiContext, form: &AnalysisForm) -> Envelope<GradcamData> {
    info!(
        has_image = form.image.is_some(),
        has_mask = form.mask.is_some(),
        "gradcam requested"
    );
    safe_envelope(&mut rand::rng(), ctx.failure_rate, OP_GRADCAM, simulate::gradcam())
}

pub async fn segment(ctx: &ApiContext, image: Option<&StoredUpload>) -> Envelope<SegmentData> {
    let (Some(scripts), Some(image)) = (&ctx.scripts, image) else {
        return safe_envelope(
            &mut rand::rng(),
            ctx.failure_rate,
            OP_SEGMENT,
            simulate::segmentation(),
        );
    };

    let out = ctx.uploads.derived_path("mask", "png");
    match scripts.segment(&image.path, &out).await {
        Ok(output) => {
            let mask_url = ctx
                .uploads
                .public_url(&output.mask_path)
                .unwrap_or_else(|| output.mask_path.display().to_string());
            Envelope::ok(
                success_message(OP_SEGMENT),
                SegmentData {
                    mask_url,
                    confidence: output.confidence.unwrap_or(0.9),
                    processing_time: None,
                },
            )
        }
        Err(err) => script_failure(OP_SEGMENT, &err, simulate::segmentation()),
    }
}

pub async fn predict(ctx: &ApiContext, form: &AnalysisForm) -> Envelope<PredictData> {
    let model = form.model.as_deref();
    let fallback = simulate::prediction(&mut rand::rng(), model);
    info!(
        model = model.unwrap_or_default(),
        has_image = form.image.is_some(),
        has_mask = form.mask.is_some(),
        "prediction requested"
    );

    let Some(scripts) = &ctx.scripts else {
        return safe_envelope(&mut rand::rng(), ctx.failure_rate, OP_PREDICT, fallback);
    };
    let (Some(image), Some(mask)) = (&form.image, &form.mask) else {
        warn!("script backend needs both image and mask uploads");
        return Envelope::simulated_failure(failure_message(OP_PREDICT), fallback);
    };

    match classify_with_scripts(ctx, scripts, image, mask).await {
        Ok(output) => Envelope::ok(
            success_message(OP_PREDICT),
            PredictData {
                classification: output.classification,
                confidence: output.confidence.clamp(0.0, 1.0),
                processing_time: None,
                model_used: fallback.model_used.clone(),
            },
        ),
        Err(err) => script_failure(OP_PREDICT, &err, fallback),
    }
}

async fn classify_with_scripts(
    ctx: &ApiContext,
    scripts: &ScriptRunner,
    image: &StoredUpload,
    mask: &StoredUpload,
) -> Result<crate::scripts::ClassifyOutput, ScriptError> {
    let mask_path = if mask.is_mat_file() {
        let out = ctx.uploads.derived_path("mask-from-mat", "png");
        let converted = scripts.convert_mat_mask(&mask.path, &out).await?;
        info!(
            variables = ?converted.variables,
            mask = %converted.mask_path.display(),
            "converted .mat mask"
        );
        converted.mask_path
    } else {
        mask.path.clone()
    };
    scripts.classify(&image.path, &mask_path).await
}

pub async fn generate_report(ctx: &ApiContext, request: &ReportRequest) -> Envelope<ReportData> {
    let now = Utc::now();
    let fallback = simulate::report(now);
    info!(
        model = %request.selected_model,
        classification = ?request.analysis_data.classification,
        "report requested"
    );

    let Some(scripts) = &ctx.scripts else {
        return safe_envelope(&mut rand::rng(), ctx.failure_rate, OP_REPORT, fallback);
    };

    let out = ctx.uploads.root().join(&fallback.filename);
    let payload = report_script_payload(request);
    match scripts.generate_report(&out, &payload).await {
        Ok(output) => {
            let pdf_url = ctx
                .uploads
                .public_url(&output.pdf_path)
                .unwrap_or_else(|| output.pdf_path.display().to_string());
            let size = tokio::fs::metadata(&output.pdf_path)
                .await
                .ok()
                .map(|meta| format_size(meta.len()));
            Envelope::ok(
                success_message(OP_REPORT),
                ReportData {
                    pdf_url,
                    filename: fallback.filename,
                    size,
                },
            )
        }
        Err(err) => script_failure(OP_REPORT, &err, fallback),
    }
}

/// The report script prints one `key: value` line per top-level entry, so
/// the request is flattened to scalars.
pub fn report_script_payload(request: &ReportRequest) -> serde_json::Value {
    let data = &request.analysis_data;
    let mut payload = serde_json::Map::new();
    payload.insert("model".into(), request.selected_model.clone().into());
    payload.insert("timestamp".into(), request.timestamp.to_rfc3339().into());
    if let Some(classification) = data.classification {
        payload.insert("classification".into(), classification.as_str().into());
    }
    if let Some(confidence) = data.confidence {
        payload.insert("confidence".into(), format!("{confidence:.3}").into());
    }
    payload.insert("maskGenerated".into(), data.mask_generated.into());
    for (key, value) in &data.metrics {
        payload.insert(key.clone(), value.clone().into());
    }
    serde_json::Value::Object(payload)
}

fn format_size(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes as f64 >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
