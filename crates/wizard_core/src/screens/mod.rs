//! One type per wizard step. Each screen keeps its own transient state and
//! talks to the shared record only through the [`WizardController`].
//!
//! [`WizardController`]: crate::controller::WizardController

pub mod confirmation;
pub mod mask_editor;
pub mod results;
pub mod upload;

pub use confirmation::{ConfirmationOutcome, ConfirmationScreen};
pub use mask_editor::MaskEditorScreen;
pub use results::{ReportAlert, ResultsView};
pub use upload::{MaskMode, UploadScreen};
