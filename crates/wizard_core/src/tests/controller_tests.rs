use super::*;
use shared::domain::Classification;

use crate::record::AssetRef;

#[test]
fn go_to_step_clears_warnings_for_every_step() {
    let mut controller = WizardController::new();
    for step in WizardStep::ALL {
        controller.add_warning("backend unavailable");
        controller.add_warning("second");
        controller.go_to_step(step);
        assert_eq!(controller.current_step(), step);
        assert!(controller.warnings().is_empty(), "{step:?} kept warnings");
    }
}

#[test]
fn progress_tracks_step_index() {
    let mut controller = WizardController::new();
    let mut seen = Vec::new();
    for step in WizardStep::ALL {
        controller.go_to_step(step);
        seen.push(controller.progress_percent());
    }
    assert_eq!(seen, vec![25.0, 50.0, 75.0, 100.0]);
}

#[test]
fn advance_and_back_stop_at_the_ends() {
    let mut controller = WizardController::new();
    controller.back();
    assert_eq!(controller.current_step(), WizardStep::Upload);
    for _ in 0..6 {
        controller.advance();
    }
    assert_eq!(controller.current_step(), WizardStep::Results);
    controller.back();
    assert_eq!(controller.current_step(), WizardStep::Confirmation);
}

#[test]
fn recorded_warnings_survive_step_changes() {
    let mut controller = WizardController::new();
    controller.record_warning("Connection error");
    controller.go_to_step(WizardStep::Results);
    assert!(controller.warnings().is_empty());
    assert_eq!(controller.record().warnings, vec!["Connection error".to_string()]);
}

#[test]
fn restart_discards_record_but_keeps_model() {
    let mut controller = WizardController::new();
    controller.select_model("resnet50_custom");
    controller.update_record(RecordPatch {
        image: Some(AssetRef::url("/uploads/1-photo.png")),
        classification: Some(Classification::Normal),
        ..RecordPatch::default()
    });
    controller.go_to_step(WizardStep::Results);
    controller.add_warning("stale");

    controller.restart();

    assert_eq!(controller.current_step(), WizardStep::Upload);
    assert_eq!(controller.record(), &AnalysisRecord::default());
    assert!(controller.warnings().is_empty());
    assert_eq!(controller.selected_model(), "resnet50_custom");
}

#[test]
fn new_controller_uses_default_model() {
    assert_eq!(WizardController::default().selected_model(), DEFAULT_MODEL_ID);
}
