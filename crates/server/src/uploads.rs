use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
};
use chrono::Utc;
use shared::error::{ApiException, ErrorCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const MAX_FILENAME_BYTES: usize = 180;
const PUBLIC_PREFIX: &str = "/uploads";

/// Flat directory of uploaded files, named `<unix-millis>-<original name>`,
/// or `<unix-millis>-<seq>-<original name>` when that name is taken.
/// Nothing is ever removed.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    sequence: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub original_name: String,
    pub content_type: Option<String>,
    pub size_bytes: usize,
}

impl StoredUpload {
    pub fn is_mat_file(&self) -> bool {
        self.original_name.to_ascii_lowercase().ends_with(".mat")
            || self
                .content_type
                .as_deref()
                .is_some_and(|mime| mime.contains("matlab"))
    }
}

/// The multipart form shared by the segment, predict and gradcam endpoints.
#[derive(Debug, Default)]
pub struct AnalysisForm {
    pub image: Option<StoredUpload>,
    pub mask: Option<StoredUpload>,
    pub model: Option<String>,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn persist(
        &self,
        original_name: &str,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> anyhow::Result<StoredUpload> {
        let original_name = sanitize_file_name(original_name);
        let millis = Utc::now().timestamp_millis();
        let mut path = self.root.join(format!("{millis}-{original_name}"));
        let mut file = loop {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break file,
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                    path = self.root.join(format!("{millis}-{seq}-{original_name}"));
                }
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("failed to create upload '{}'", path.display()))
                }
            }
        };
        file.write_all(bytes)
            .await
            .with_context(|| format!("failed to write upload '{}'", path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("failed to flush upload '{}'", path.display()))?;
        info!(path = %path.display(), size_bytes = bytes.len(), "stored upload");
        Ok(StoredUpload {
            path,
            original_name,
            content_type,
            size_bytes: bytes.len(),
        })
    }

    /// Location for a file produced by a script, e.g. a converted mask.
    pub fn derived_path(&self, stem: &str, extension: &str) -> PathBuf {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            "{}-{}-{seq}.{extension}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(stem)
        ))
    }

    /// Maps a path under the upload root to the URL it is served from.
    pub fn public_url(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(format!("{PUBLIC_PREFIX}/{}", parts.join("/")))
    }
}

pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    while cleaned.starts_with('.') {
        cleaned.remove(0);
    }
    if cleaned.len() > MAX_FILENAME_BYTES {
        cleaned = cleaned[cleaned.len() - MAX_FILENAME_BYTES..].to_string();
    }
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Reads the `image`, `mask` and `model` parts, persisting files as they
/// arrive. Unknown parts are skipped.
pub async fn read_analysis_form(
    uploads: &UploadStore,
    mut multipart: Multipart,
) -> Result<AnalysisForm, ApiException> {
    let mut form = AnalysisForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_failure(e, "invalid multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "mask" => {
                let file_name = field.file_name().unwrap_or(name.as_str()).to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_failure(e, &format!("failed to read '{name}' part")))?;
                if bytes.is_empty() {
                    debug!(part = %name, "skipping empty file part");
                    continue;
                }
                let stored = uploads
                    .persist(&file_name, content_type, &bytes)
                    .await
                    .map_err(|e| ApiException::new(ErrorCode::Internal, e.to_string()))?;
                if name == "image" {
                    form.image = Some(stored);
                } else {
                    form.mask = Some(stored);
                }
            }
            "model" => {
                let model = field
                    .text()
                    .await
                    .map_err(|e| multipart_failure(e, "invalid model field"))?;
                let model = model.trim();
                if !model.is_empty() {
                    form.model = Some(model.to_string());
                }
            }
            other => debug!(part = other, "ignoring unknown multipart part"),
        }
    }

    Ok(form)
}

/// A body cut off by the upload limit is a 413, anything else a 400.
fn multipart_failure(err: MultipartError, context: &str) -> ApiException {
    let code = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorCode::PayloadTooLarge
    } else {
        ErrorCode::Validation
    };
    ApiException::new(code, format!("{context}: {err}"))
}
