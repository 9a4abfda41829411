use super::*;
use crate::test_support::{Behavior, FakeApi};

fn png_file() -> UploadedFile {
    UploadedFile::new("photo.png", Some("image/png".into()), b"png-bytes".to_vec())
}

fn mat_file() -> UploadedFile {
    UploadedFile::new("kidney_mask.mat", None, b"MATLAB 5.0".to_vec())
}

#[test]
fn non_image_files_are_rejected_with_a_warning() {
    let cases = [
        UploadedFile::new("report.pdf", Some("application/pdf".into()), vec![1]),
        UploadedFile::new("notes.txt", None, vec![1]),
        UploadedFile::new("mask.mat", None, vec![1]),
        UploadedFile::new("no-extension", None, vec![1]),
    ];
    for file in cases {
        let mut controller = WizardController::new();
        let mut screen = UploadScreen::new();
        let name = file.name.clone();
        screen.select_image(&mut controller, file);
        assert!(screen.image().is_none(), "{name} was accepted");
        assert_eq!(controller.warnings(), [INVALID_IMAGE_WARNING.to_string()]);
    }
}

#[test]
fn image_mime_is_guessed_from_name_when_missing() {
    let mut controller = WizardController::new();
    let mut screen = UploadScreen::new();
    screen.select_image(&mut controller, UploadedFile::new("scan.JPG", None, vec![1, 2]));
    assert!(matches!(screen.image(), Some(AssetRef::File(_))));
    assert!(controller.warnings().is_empty());
}

#[test]
fn unreadable_image_becomes_placeholder() {
    let mut controller = WizardController::new();
    let mut screen = UploadScreen::new();
    screen.select_image(&mut controller, UploadedFile::new("photo.png", None, Vec::new()));
    assert_eq!(screen.image(), Some(&AssetRef::url(PLACEHOLDER_IMAGE)));
    assert_eq!(controller.warnings(), [IMAGE_READ_WARNING.to_string()]);
}

#[test]
fn mask_accepts_mat_name_or_matlab_mime() {
    let mut controller = WizardController::new();
    let mut screen = UploadScreen::new();

    screen.select_mask(&mut controller, mat_file());
    assert!(screen.mask().is_some());

    let mut screen = UploadScreen::new();
    screen.select_mask(
        &mut controller,
        UploadedFile::new("mask.bin", Some("application/x-matlab-data".into()), vec![1]),
    );
    assert!(screen.mask().is_some());
    assert!(controller.warnings().is_empty());

    let mut screen = UploadScreen::new();
    screen.select_mask(&mut controller, png_file());
    assert!(screen.mask().is_none());
    assert_eq!(controller.warnings(), [INVALID_MASK_WARNING.to_string()]);
}

#[test]
fn advance_stores_selection_and_moves_to_mask_edit() {
    let mut controller = WizardController::new();
    let mut screen = UploadScreen::new();
    screen.select_image(&mut controller, png_file());
    screen.select_mask(&mut controller, mat_file());

    screen.advance(&mut controller);

    assert_eq!(controller.current_step(), WizardStep::MaskEdit);
    let record = controller.record();
    assert_eq!(record.image, Some(AssetRef::File(png_file())));
    assert_eq!(record.mask, Some(AssetRef::File(mat_file())));
    assert!(!record.mask_generated);
    assert!(record.warnings.is_empty());
}

#[test]
fn advance_without_selection_substitutes_placeholders() {
    let mut controller = WizardController::new();
    let mut screen = UploadScreen::new();

    screen.advance(&mut controller);

    assert_eq!(controller.current_step(), WizardStep::MaskEdit);
    let record = controller.record();
    assert_eq!(record.image, Some(AssetRef::url(PLACEHOLDER_IMAGE)));
    assert_eq!(record.mask, Some(AssetRef::url(PLACEHOLDER_MASK)));
    assert_eq!(
        record.warnings,
        vec![MISSING_IMAGE_WARNING.to_string(), MISSING_MASK_WARNING.to_string()]
    );
}

#[tokio::test]
async fn auto_mask_uses_segment_result() {
    let api = FakeApi::default();
    let mut controller = WizardController::new();
    let mut screen = UploadScreen::new();
    screen.select_image(&mut controller, png_file());
    screen.set_mask_mode(MaskMode::AutoGenerate);

    screen.request_auto_mask(&api, &mut controller).await;
    screen.advance(&mut controller);

    assert_eq!(api.calls(), vec!["segment"]);
    let uploads = api.uploads.lock().expect("uploads");
    assert_eq!(uploads[0].image.as_ref().map(|p| p.file_name.as_str()), Some("photo.png"));
    assert!(uploads[0].mask.is_none());
    assert_eq!(controller.record().mask, Some(AssetRef::url("/uploads/7-mask.png")));
    assert!(controller.record().mask_generated);
}

#[tokio::test]
async fn auto_mask_envelope_error_warns_but_keeps_data() {
    let api = FakeApi {
        segment: Behavior::Report,
        ..FakeApi::default()
    };
    let mut controller = WizardController::new();
    let mut screen = UploadScreen::new();
    screen.set_mask_mode(MaskMode::AutoGenerate);

    screen.request_auto_mask(&api, &mut controller).await;

    assert_eq!(screen.mask(), Some(&AssetRef::url("/uploads/7-mask.png")));
    assert_eq!(controller.warnings(), ["segment failed upstream".to_string()]);
}

#[tokio::test]
async fn auto_mask_transport_failure_uses_placeholder() {
    let api = FakeApi::all(Behavior::Unreachable);
    let mut controller = WizardController::new();
    let mut screen = UploadScreen::new();
    screen.select_image(&mut controller, png_file());
    screen.set_mask_mode(MaskMode::AutoGenerate);

    screen.request_auto_mask(&api, &mut controller).await;

    assert_eq!(screen.mask(), Some(&AssetRef::url(PLACEHOLDER_MASK)));
    assert_eq!(controller.warnings(), [AUTO_MASK_WARNING.to_string()]);
}

#[tokio::test]
async fn auto_mask_is_skipped_in_upload_mode() {
    let api = FakeApi::default();
    let mut controller = WizardController::new();
    let mut screen = UploadScreen::new();
    screen.request_auto_mask(&api, &mut controller).await;
    assert!(api.calls().is_empty());
    assert!(screen.mask().is_none());
}
