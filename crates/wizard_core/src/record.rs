use std::{fs, io, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{domain::Classification, protocol::AnalysisSummary};

use crate::error::ClientError;

pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg?height=300&width=400&text=Simulated+Image";
pub const PLACEHOLDER_MASK: &str = "/placeholder.svg?height=400&width=400&text=Simulated+Mask";
pub const PLACEHOLDER_EDITED_MASK: &str =
    "/placeholder.svg?height=400&width=600&text=Edited+Mask";
pub const PLACEHOLDER_GRADCAM: &str =
    "/placeholder.svg?height=400&width=400&text=Simulated+Grad-CAM";

/// A file picked by the user, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Ok(Self::new(name, mime_type, bytes))
    }

    /// Declared MIME type, or one guessed from the file name.
    pub fn effective_mime(&self) -> Option<String> {
        self.mime_type
            .as_deref()
            .map(str::trim)
            .filter(|mime| !mime.is_empty())
            .map(str::to_string)
            .or_else(|| {
                mime_guess::from_path(&self.name)
                    .first()
                    .map(|mime| mime.essence_str().to_string())
            })
    }
}

/// Where an image, mask or heat-map comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetRef {
    File(UploadedFile),
    /// A server path, a placeholder URL or an embedded `data:` URL.
    Url(String),
}

impl AssetRef {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn png_data_url(bytes: &[u8]) -> Self {
        Self::Url(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(file) => Some(file),
            Self::Url(_) => None,
        }
    }

    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::File(_) => None,
            Self::Url(url) => Some(url),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.as_url()
            .is_some_and(|url| url.starts_with("/placeholder.svg") || url.starts_with("/api/placeholder"))
    }

    /// Short text for logs and reports; never the full data URL.
    pub fn describe(&self) -> String {
        match self {
            Self::File(file) => file.name.clone(),
            Self::Url(url) if url.starts_with("data:") => {
                let header = url.split(',').next().unwrap_or("data:");
                format!("{header},<{} chars>", url.len())
            }
            Self::Url(url) => url.clone(),
        }
    }

    /// Raw bytes for files and `data:` URLs. Plain URLs yield `None`.
    pub fn bytes(&self) -> Result<Option<Vec<u8>>, ClientError> {
        match self {
            Self::File(file) => Ok(Some(file.bytes.clone())),
            Self::Url(url) if url.starts_with("data:") => decode_data_url(url).map(|(_, b)| Some(b)),
            Self::Url(_) => Ok(None),
        }
    }
}

/// Splits `data:<mime>;base64,<payload>` into its MIME type and bytes.
pub fn decode_data_url(url: &str) -> Result<(Option<String>, Vec<u8>), ClientError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| ClientError::InvalidDataUrl("missing data: prefix".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ClientError::InvalidDataUrl("missing payload separator".into()))?;
    let Some(mime) = header.strip_suffix(";base64") else {
        return Err(ClientError::InvalidDataUrl(
            "only base64 data urls are supported".into(),
        ));
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ClientError::InvalidDataUrl(e.to_string()))?;
    let mime = (!mime.is_empty()).then(|| mime.to_string());
    Ok((mime, bytes))
}

/// State accumulated across the wizard steps. Lives for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisRecord {
    pub image: Option<AssetRef>,
    pub mask: Option<AssetRef>,
    pub mask_generated: bool,
    pub classification: Option<Classification>,
    pub confidence: Option<f64>,
    pub gradcam_url: Option<String>,
    /// Metric name to formatted value, in display order.
    pub metrics: Vec<(String, String)>,
    pub warnings: Vec<String>,
    /// Warnings from the latest classification run only; replaced on each run.
    pub classification_warnings: Vec<String>,
}

/// Partial update; `Some` fields overwrite, `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub image: Option<AssetRef>,
    pub mask: Option<AssetRef>,
    pub mask_generated: Option<bool>,
    pub classification: Option<Classification>,
    pub confidence: Option<f64>,
    pub gradcam_url: Option<String>,
    pub metrics: Option<Vec<(String, String)>>,
    pub warnings: Option<Vec<String>>,
    pub classification_warnings: Option<Vec<String>>,
}

impl AnalysisRecord {
    pub fn merge(&mut self, patch: RecordPatch) {
        let RecordPatch {
            image,
            mask,
            mask_generated,
            classification,
            confidence,
            gradcam_url,
            metrics,
            warnings,
            classification_warnings,
        } = patch;

        if image.is_some() {
            self.image = image;
        }
        if mask.is_some() {
            self.mask = mask;
        }
        if let Some(generated) = mask_generated {
            self.mask_generated = generated;
        }
        if classification.is_some() {
            self.classification = classification;
        }
        if confidence.is_some() {
            self.confidence = confidence;
        }
        if gradcam_url.is_some() {
            self.gradcam_url = gradcam_url;
        }
        if let Some(metrics) = metrics {
            self.metrics = metrics;
        }
        if let Some(warnings) = warnings {
            self.warnings = warnings;
        }
        if let Some(warnings) = classification_warnings {
            self.classification_warnings = warnings;
        }
    }

    /// Step warnings followed by those of the latest classification run.
    pub fn all_warnings(&self) -> Vec<String> {
        self.warnings
            .iter()
            .chain(&self.classification_warnings)
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            image: self.image.as_ref().map(AssetRef::describe),
            mask: self.mask.as_ref().map(AssetRef::describe),
            mask_generated: self.mask_generated,
            classification: self.classification,
            confidence: self.confidence,
            gradcam_url: self.gradcam_url.clone(),
            metrics: self.metrics.iter().cloned().collect(),
            errors: self.all_warnings(),
        }
    }
}

#[cfg(test)]
#[path = "tests/record_tests.rs"]
mod tests;
