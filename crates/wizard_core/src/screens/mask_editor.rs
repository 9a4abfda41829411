use shared::domain::WizardStep;
use tracing::{debug, info, warn};

use crate::{
    controller::WizardController,
    error::ClientError,
    mask::{clamp_brush_size, MaskCanvas, Tool, DEFAULT_BRUSH_SIZE},
    record::{AssetRef, RecordPatch, PLACEHOLDER_EDITED_MASK},
};

pub const IMAGE_UNAVAILABLE_WARNING: &str =
    "Could not load the image. Using an empty canvas for editing.";
pub const SAVE_FAILED_WARNING: &str = "Could not save the mask. Continuing with a simulated mask.";

pub struct MaskEditorScreen {
    canvas: MaskCanvas,
    tool: Tool,
    brush_size: u32,
}

impl MaskEditorScreen {
    /// Loads the record's image onto a fresh canvas. Anything that cannot be
    /// decoded locally leaves a blank canvas and a warning.
    pub fn open(controller: &mut WizardController) -> Self {
        let canvas = match controller.record().image.as_ref().map(load_canvas) {
            Some(Ok(canvas)) => canvas,
            Some(Err(error)) => {
                warn!(%error, "mask editor: image could not be loaded");
                controller.add_warning(IMAGE_UNAVAILABLE_WARNING);
                MaskCanvas::blank()
            }
            None => {
                controller.add_warning(IMAGE_UNAVAILABLE_WARNING);
                MaskCanvas::blank()
            }
        };
        Self {
            canvas,
            tool: Tool::Brush,
            brush_size: DEFAULT_BRUSH_SIZE,
        }
    }

    pub fn canvas(&self) -> &MaskCanvas {
        &self.canvas
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = clamp_brush_size(size);
    }

    pub fn paint_at(&mut self, x: f32, y: f32) {
        self.canvas.dab(self.tool, x, y, self.brush_size);
    }

    pub fn stroke(&mut self, points: &[(f32, f32)]) {
        debug!(points = points.len(), tool = ?self.tool, "mask editor: stroke");
        self.canvas.stroke(self.tool, points, self.brush_size);
    }

    pub fn clear(&mut self) {
        self.canvas.clear();
    }

    /// Serializes the canvas into the record's mask.
    pub fn save(&self, controller: &mut WizardController) {
        let mask = match self.canvas.to_data_url() {
            Ok(mask) => {
                info!(pristine = self.canvas.is_pristine(), "mask editor: mask saved");
                mask
            }
            Err(error) => {
                warn!(%error, "mask editor: mask could not be encoded");
                controller.record_warning(SAVE_FAILED_WARNING);
                AssetRef::url(PLACEHOLDER_EDITED_MASK)
            }
        };
        controller.update_record(RecordPatch {
            mask: Some(mask),
            ..RecordPatch::default()
        });
    }

    pub fn advance(&self, controller: &mut WizardController) {
        self.save(controller);
        controller.go_to_step(WizardStep::Confirmation);
    }

    pub fn back(&self, controller: &mut WizardController) {
        controller.go_to_step(WizardStep::Upload);
    }
}

fn load_canvas(image: &AssetRef) -> Result<MaskCanvas, ClientError> {
    match image.bytes()? {
        Some(bytes) => MaskCanvas::from_image_bytes(&bytes),
        None => Err(ClientError::AssetUnavailable(image.describe())),
    }
}

#[cfg(test)]
#[path = "tests/mask_editor_tests.rs"]
mod tests;
