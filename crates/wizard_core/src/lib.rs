//! Client side of the renal analysis wizard: the step controller, the four
//! screens, the mask canvas and a typed client for the analysis backend.

pub mod api;
pub mod controller;
pub mod error;
pub mod mask;
pub mod models;
pub mod record;
pub mod screens;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

pub use api::{AnalysisApi, AnalysisUpload, HttpAnalysisApi, UploadPart};
pub use controller::WizardController;
pub use error::ClientError;
pub use mask::{MaskCanvas, Tool};
pub use record::{AnalysisRecord, AssetRef, RecordPatch, UploadedFile};
