use shared::domain::{WizardStep, DEFAULT_MODEL_ID};
use tracing::{info, warn};

use crate::record::{AnalysisRecord, RecordPatch};

/// Owns the active step and the record shared by all screens.
#[derive(Debug, Clone)]
pub struct WizardController {
    current_step: WizardStep,
    record: AnalysisRecord,
    selected_model: String,
    warnings: Vec<String>,
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardController {
    pub fn new() -> Self {
        Self {
            current_step: WizardStep::Upload,
            record: AnalysisRecord::default(),
            selected_model: DEFAULT_MODEL_ID.to_string(),
            warnings: Vec::new(),
        }
    }

    pub fn current_step(&self) -> WizardStep {
        self.current_step
    }

    pub fn record(&self) -> &AnalysisRecord {
        &self.record
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    /// Banner warnings for the active step.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Switches screens. Banner warnings belong to the screen being left.
    pub fn go_to_step(&mut self, step: WizardStep) {
        info!(from = ?self.current_step, to = ?step, "wizard: changing step");
        self.current_step = step;
        self.warnings.clear();
    }

    pub fn advance(&mut self) {
        if let Some(next) = self.current_step.next() {
            self.go_to_step(next);
        }
    }

    pub fn back(&mut self) {
        if let Some(previous) = self.current_step.previous() {
            self.go_to_step(previous);
        }
    }

    pub fn update_record(&mut self, patch: RecordPatch) {
        self.record.merge(patch);
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(step = ?self.current_step, %message, "wizard: warning");
        self.warnings.push(message);
    }

    /// Banner warning that is also kept on the record, so it outlives the
    /// next step change and ends up in the report.
    pub fn record_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.record.warnings.push(message.clone());
        self.add_warning(message);
    }

    pub fn restart(&mut self) {
        info!("wizard: restarting session");
        self.record = AnalysisRecord::default();
        self.go_to_step(WizardStep::Upload);
    }

    pub fn select_model(&mut self, model_id: impl Into<String>) {
        self.selected_model = model_id.into();
    }

    pub fn progress_percent(&self) -> f64 {
        (self.current_step.index() + 1) as f64 / WizardStep::ALL.len() as f64 * 100.0
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
