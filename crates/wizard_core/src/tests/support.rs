//! In-memory [`AnalysisApi`] used by the screen tests.

use std::sync::Mutex;

use async_trait::async_trait;
use shared::{
    domain::{default_models, Classification, ModelDescriptor},
    protocol::{
        Envelope, GradcamData, ModelMetrics, PredictData, ReportData, ReportRequest, SegmentData,
    },
};

use crate::{
    api::{AnalysisApi, AnalysisUpload},
    error::ClientError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Behavior {
    #[default]
    Succeed,
    /// Well-formed envelope with `error: true`.
    Report,
    /// Backend unreachable.
    Unreachable,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub segment: Behavior,
    pub predict: Behavior,
    pub gradcam: Behavior,
    pub metrics: Behavior,
    pub models: Behavior,
    pub report: Behavior,
    pub predict_confidence: Option<f64>,
    pub calls: Mutex<Vec<&'static str>>,
    pub uploads: Mutex<Vec<AnalysisUpload>>,
    pub reports: Mutex<Vec<ReportRequest>>,
}

pub(crate) fn transport_error() -> ClientError {
    let err = reqwest::Client::new()
        .get("not a url")
        .build()
        .expect_err("invalid url must not build");
    ClientError::Transport(err)
}

impl FakeApi {
    pub fn all(behavior: Behavior) -> Self {
        Self {
            segment: behavior,
            predict: behavior,
            gradcam: behavior,
            metrics: behavior,
            models: behavior,
            report: behavior,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls").clone()
    }

    fn respond<T>(&self, op: &'static str, behavior: Behavior, data: T) -> Result<Envelope<T>, ClientError> {
        self.calls.lock().expect("calls").push(op);
        match behavior {
            Behavior::Succeed => Ok(Envelope::ok(format!("{op} completed successfully"), data)),
            Behavior::Report => Ok(Envelope::simulated_failure(format!("{op} failed upstream"), data)),
            Behavior::Unreachable => Err(transport_error()),
        }
    }
}

#[async_trait]
impl AnalysisApi for FakeApi {
    async fn segment(&self, upload: AnalysisUpload) -> Result<Envelope<SegmentData>, ClientError> {
        self.uploads.lock().expect("uploads").push(upload);
        self.respond(
            "segment",
            self.segment,
            SegmentData {
                mask_url: "/uploads/7-mask.png".to_string(),
                confidence: 0.87,
                processing_time: Some("2.3s".to_string()),
            },
        )
    }

    async fn predict(&self, upload: AnalysisUpload) -> Result<Envelope<PredictData>, ClientError> {
        let model_used = upload.model.clone();
        self.uploads.lock().expect("uploads").push(upload);
        self.respond(
            "predict",
            self.predict,
            PredictData {
                classification: Classification::Pathological,
                confidence: self.predict_confidence.unwrap_or(0.812),
                processing_time: Some("1.8s".to_string()),
                model_used,
            },
        )
    }

    async fn gradcam(&self, upload: AnalysisUpload) -> Result<Envelope<GradcamData>, ClientError> {
        self.uploads.lock().expect("uploads").push(upload);
        self.respond(
            "gradcam",
            self.gradcam,
            GradcamData {
                gradcam_url: "/api/placeholder-gradcam".to_string(),
                heatmap_intensity: Some("high".to_string()),
                focus_areas: vec!["cortex".to_string()],
            },
        )
    }

    async fn model_metrics(&self) -> Result<Envelope<ModelMetrics>, ClientError> {
        self.respond(
            "metrics",
            self.metrics,
            ModelMetrics {
                accuracy: "0.950".into(),
                precision: "0.900".into(),
                recall: "0.910".into(),
                f1_score: "0.905".into(),
                auc: "0.960".into(),
            },
        )
    }

    async fn models(&self) -> Result<Envelope<Vec<ModelDescriptor>>, ClientError> {
        self.respond("models", self.models, default_models())
    }

    async fn generate_report(
        &self,
        request: &ReportRequest,
    ) -> Result<Envelope<ReportData>, ClientError> {
        self.reports.lock().expect("reports").push(request.clone());
        self.respond(
            "report",
            self.report,
            ReportData {
                pdf_url: "/api/placeholder-pdf".to_string(),
                filename: "renal_analysis_1.pdf".to_string(),
                size: Some("2.4 MB".to_string()),
            },
        )
    }
}
