use shared::domain::WizardStep;
use tracing::{info, warn};

use crate::{
    api::{AnalysisApi, AnalysisUpload},
    controller::WizardController,
    record::{AnalysisRecord, AssetRef, RecordPatch, UploadedFile, PLACEHOLDER_IMAGE, PLACEHOLDER_MASK},
};

pub const INVALID_IMAGE_WARNING: &str = "Please select a valid image file (.jpg, .png)";
pub const INVALID_MASK_WARNING: &str = "Please select a valid .mat file for the mask";
pub const IMAGE_READ_WARNING: &str = "Could not read the image. Continuing with a simulated image.";
pub const MISSING_IMAGE_WARNING: &str = "No image was provided. Continuing with a simulated image.";
pub const MISSING_MASK_WARNING: &str = "No mask was provided. Continuing with a simulated mask.";
pub const AUTO_MASK_WARNING: &str =
    "Automatic mask generation failed. Continuing with a simulated mask.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskMode {
    #[default]
    UploadMat,
    AutoGenerate,
}

#[derive(Debug, Clone, Default)]
pub struct UploadScreen {
    image: Option<AssetRef>,
    mask: Option<AssetRef>,
    mask_mode: MaskMode,
    mask_generated: bool,
}

impl UploadScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&AssetRef> {
        self.image.as_ref()
    }

    pub fn mask(&self) -> Option<&AssetRef> {
        self.mask.as_ref()
    }

    pub fn mask_mode(&self) -> MaskMode {
        self.mask_mode
    }

    pub fn select_image(&mut self, controller: &mut WizardController, file: UploadedFile) {
        let is_image = file
            .effective_mime()
            .is_some_and(|mime| mime.starts_with("image/"));
        if !is_image {
            controller.add_warning(INVALID_IMAGE_WARNING);
            return;
        }
        if file.bytes.is_empty() {
            self.image_read_failed(controller, &file.name);
            return;
        }
        info!(name = %file.name, size = file.bytes.len(), "upload: image selected");
        self.image = Some(AssetRef::File(file));
    }

    /// The picked image could not be read; keep going with a placeholder.
    pub fn image_read_failed(&mut self, controller: &mut WizardController, name: &str) {
        warn!(name, "upload: image could not be read");
        controller.add_warning(IMAGE_READ_WARNING);
        self.image = Some(AssetRef::url(PLACEHOLDER_IMAGE));
    }

    pub fn select_mask(&mut self, controller: &mut WizardController, file: UploadedFile) {
        let is_mat = file.name.to_ascii_lowercase().ends_with(".mat")
            || file
                .effective_mime()
                .is_some_and(|mime| mime.contains("matlab"));
        if !is_mat {
            controller.add_warning(INVALID_MASK_WARNING);
            return;
        }
        info!(name = %file.name, size = file.bytes.len(), "upload: mask selected");
        self.mask = Some(AssetRef::File(file));
        self.mask_generated = false;
    }

    pub fn set_mask_mode(&mut self, mode: MaskMode) {
        self.mask_mode = mode;
    }

    /// Asks the backend to segment the selected image. Never fails: a broken
    /// backend leaves a placeholder mask and a warning behind.
    pub async fn request_auto_mask(
        &mut self,
        api: &dyn AnalysisApi,
        controller: &mut WizardController,
    ) {
        if self.mask_mode != MaskMode::AutoGenerate {
            return;
        }
        let record = AnalysisRecord {
            image: self.image.clone(),
            ..AnalysisRecord::default()
        };
        let result = match AnalysisUpload::image_only(&record) {
            Ok(upload) => api.segment(upload).await,
            Err(error) => Err(error),
        };
        match result {
            Ok(envelope) => {
                if envelope.error {
                    controller.add_warning(envelope.message);
                }
                info!(
                    mask_url = %envelope.data.mask_url,
                    confidence = envelope.data.confidence,
                    "upload: mask generated"
                );
                self.mask = Some(AssetRef::url(envelope.data.mask_url));
            }
            Err(error) => {
                warn!(%error, "upload: segmentation request failed");
                controller.add_warning(AUTO_MASK_WARNING);
                self.mask = Some(AssetRef::url(PLACEHOLDER_MASK));
            }
        }
        self.mask_generated = true;
    }

    /// Stores the selections on the record and moves on to mask editing.
    pub fn advance(&mut self, controller: &mut WizardController) {
        let image = match self.image.clone() {
            Some(image) => image,
            None => {
                controller.record_warning(MISSING_IMAGE_WARNING);
                AssetRef::url(PLACEHOLDER_IMAGE)
            }
        };
        let mask = match self.mask.clone() {
            Some(mask) => mask,
            None => {
                controller.record_warning(MISSING_MASK_WARNING);
                AssetRef::url(PLACEHOLDER_MASK)
            }
        };
        controller.update_record(RecordPatch {
            image: Some(image),
            mask: Some(mask),
            mask_generated: Some(self.mask_generated),
            ..RecordPatch::default()
        });
        controller.go_to_step(WizardStep::MaskEdit);
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
