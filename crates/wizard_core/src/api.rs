use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::ModelDescriptor,
    protocol::{
        Envelope, GradcamData, ModelMetrics, PredictData, ReportData, ReportRequest, SegmentData,
    },
};
use tracing::debug;

use crate::{
    error::ClientError,
    record::{decode_data_url, AnalysisRecord, AssetRef},
};

/// One file part of a multipart analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPart {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadPart {
    /// Files are sent as-is and `data:` URLs are decoded. Plain URLs point at
    /// something the server already has, so they produce no part.
    fn from_asset(asset: &AssetRef, fallback_name: &str) -> Result<Option<Self>, ClientError> {
        match asset {
            AssetRef::File(file) => Ok(Some(Self {
                file_name: file.name.clone(),
                mime_type: file.effective_mime(),
                bytes: file.bytes.clone(),
            })),
            AssetRef::Url(url) if url.starts_with("data:") => {
                let (mime_type, bytes) = decode_data_url(url)?;
                Ok(Some(Self {
                    file_name: fallback_name.to_string(),
                    mime_type,
                    bytes,
                }))
            }
            AssetRef::Url(_) => Ok(None),
        }
    }

    fn into_part(self) -> Result<Part, ClientError> {
        let part = Part::bytes(self.bytes).file_name(self.file_name);
        Ok(match self.mime_type {
            Some(mime) => part.mime_str(&mime)?,
            None => part,
        })
    }
}

/// Multipart body shared by segment, predict and gradcam.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisUpload {
    pub image: Option<UploadPart>,
    pub mask: Option<UploadPart>,
    pub model: Option<String>,
}

impl AnalysisUpload {
    pub fn from_record(record: &AnalysisRecord, model: Option<&str>) -> Result<Self, ClientError> {
        let image = match &record.image {
            Some(asset) => UploadPart::from_asset(asset, "image.png")?,
            None => None,
        };
        let mask = match &record.mask {
            Some(asset) => UploadPart::from_asset(asset, "mask.png")?,
            None => None,
        };
        Ok(Self {
            image,
            mask,
            model: model.map(str::to_string),
        })
    }

    pub fn image_only(record: &AnalysisRecord) -> Result<Self, ClientError> {
        let mut upload = Self::from_record(record, None)?;
        upload.mask = None;
        Ok(upload)
    }

    fn into_form(self) -> Result<Form, ClientError> {
        let mut form = Form::new();
        if let Some(image) = self.image {
            form = form.part("image", image.into_part()?);
        }
        if let Some(mask) = self.mask {
            form = form.part("mask", mask.into_part()?);
        }
        if let Some(model) = self.model {
            form = form.text("model", model);
        }
        Ok(form)
    }
}

/// Calls the wizard makes against the analysis backend.
///
/// `Ok` means a well-formed envelope arrived, which may still have `error`
/// set. `Err` means the backend could not be reached or answered garbage.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    async fn segment(&self, upload: AnalysisUpload) -> Result<Envelope<SegmentData>, ClientError>;
    async fn predict(&self, upload: AnalysisUpload) -> Result<Envelope<PredictData>, ClientError>;
    async fn gradcam(&self, upload: AnalysisUpload) -> Result<Envelope<GradcamData>, ClientError>;
    async fn model_metrics(&self) -> Result<Envelope<ModelMetrics>, ClientError>;
    async fn models(&self) -> Result<Envelope<Vec<ModelDescriptor>>, ClientError>;
    async fn generate_report(
        &self,
        request: &ReportRequest,
    ) -> Result<Envelope<ReportData>, ClientError>;
}

pub struct HttpAnalysisApi {
    http: Client,
    server_url: String,
}

impl HttpAnalysisApi {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { http, server_url }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        upload: AnalysisUpload,
    ) -> Result<Envelope<T>, ClientError> {
        debug!(
            path,
            image = upload.image.is_some(),
            mask = upload.mask.is_some(),
            "api: posting analysis form"
        );
        let form = upload.into_form()?;
        let envelope = self
            .http
            .post(format!("{}{path}", self.server_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ClientError> {
        let envelope = self
            .http
            .get(format!("{}{path}", self.server_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope)
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisApi {
    async fn segment(&self, upload: AnalysisUpload) -> Result<Envelope<SegmentData>, ClientError> {
        self.post_form("/api/segment", upload).await
    }

    async fn predict(&self, upload: AnalysisUpload) -> Result<Envelope<PredictData>, ClientError> {
        self.post_form("/api/predict", upload).await
    }

    async fn gradcam(&self, upload: AnalysisUpload) -> Result<Envelope<GradcamData>, ClientError> {
        self.post_form("/api/gradcam", upload).await
    }

    async fn model_metrics(&self) -> Result<Envelope<ModelMetrics>, ClientError> {
        self.get_json("/api/model-metrics").await
    }

    async fn models(&self) -> Result<Envelope<Vec<ModelDescriptor>>, ClientError> {
        self.get_json("/api/models").await
    }

    async fn generate_report(
        &self,
        request: &ReportRequest,
    ) -> Result<Envelope<ReportData>, ClientError> {
        let envelope = self
            .http
            .post(format!("{}/api/generate-pdf", self.server_url))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope)
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
