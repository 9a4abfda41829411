use super::*;

use std::fs;

fn runner_with(scripts: &[(&str, &str)]) -> (tempfile::TempDir, ScriptRunner) {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, body) in scripts {
        fs::write(dir.path().join(name), body).expect("write script");
    }
    let runner = ScriptRunner::new(dir.path(), Some("sh".to_string()));
    (dir, runner)
}

#[tokio::test]
async fn classify_relays_script_json() {
    let (_dir, runner) = runner_with(&[(
        CLASSIFY_SCRIPT,
        r#"echo '{"classification": "pathological", "confidence": 0.812}'"#,
    )]);
    let output = runner
        .classify(Path::new("image.png"), Path::new("mask.png"))
        .await
        .expect("classify");
    assert_eq!(output.classification, Classification::Pathological);
    assert!((output.confidence - 0.812).abs() < 1e-9);
}

#[tokio::test]
async fn script_arguments_are_passed_through() {
    let (dir, runner) = runner_with(&[(
        SEGMENT_SCRIPT,
        r#"printf '{"mask_path": "%s", "confidence": 0.9}' "$2""#,
    )]);
    let out = dir.path().join("out.png");
    let output = runner
        .segment(Path::new("in.png"), &out)
        .await
        .expect("segment");
    assert_eq!(output.mask_path, out);
    assert_eq!(output.confidence, Some(0.9));
}

#[tokio::test]
async fn report_payload_is_written_to_stdin() {
    let (dir, runner) = runner_with(&[(
        GENERATE_PDF_SCRIPT,
        r#"cat > "$1.json"; printf '{"pdf_path": "%s"}' "$1""#,
    )]);
    let out = dir.path().join("report.pdf");
    let payload = serde_json::json!({ "classification": "normal" });
    let output = runner
        .generate_report(&out, &payload)
        .await
        .expect("report");
    assert_eq!(output.pdf_path, out);

    let written = fs::read_to_string(dir.path().join("report.pdf.json")).expect("stdin copy");
    let echoed: serde_json::Value = serde_json::from_str(&written).expect("json");
    assert_eq!(echoed, payload);
}

#[tokio::test]
async fn non_zero_exit_is_reported() {
    let (_dir, runner) = runner_with(&[(CLASSIFY_SCRIPT, "echo boom >&2; exit 3")]);
    let err = runner
        .classify(Path::new("a"), Path::new("b"))
        .await
        .expect_err("must fail");
    match err {
        ScriptError::Exit { code, stderr, .. } => {
            assert_eq!(code, Some(3));
            assert_eq!(stderr, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_script_interpreter_fails_to_spawn() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = ScriptRunner::new(
        dir.path(),
        Some("definitely-not-an-interpreter-4b1d".to_string()),
    );
    let err = runner
        .classify(Path::new("a"), Path::new("b"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, ScriptError::Spawn { .. }));
}

#[test]
fn error_key_in_output_is_a_reported_failure() {
    let err = parse_output::<ClassifyOutput>(CLASSIFY_SCRIPT, br#"{"error": "missing arguments"}"#)
        .expect_err("must fail");
    match err {
        ScriptError::Reported { message, .. } => assert_eq!(message, "missing arguments"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_json_output_is_invalid() {
    let err = parse_output::<ClassifyOutput>(CLASSIFY_SCRIPT, b"Traceback (most recent call last)")
        .expect_err("must fail");
    assert!(matches!(err, ScriptError::InvalidOutput { .. }));
}

#[test]
fn mask_conversion_output_defaults_variables() {
    let output: MaskConversionOutput =
        parse_output(PROCESS_MAT_SCRIPT, br#"{"mask_path": "uploads/m.png"}"#).expect("parse");
    assert_eq!(output.mask_path, PathBuf::from("uploads/m.png"));
    assert!(output.variables.is_empty());
}
