use super::*;
use axum::{body, body::Body, http::Request};
use shared::domain::{default_models, Classification};
use tower::ServiceExt;

const BOUNDARY: &str = "renal-test-boundary";

struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    content_type: Option<&'a str>,
    bytes: &'a [u8],
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file_name {
            Some(file_name) => out.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\n",
                    part.name
                )
                .as_bytes(),
            ),
            None => out.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(content_type) = part.content_type {
            out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(part.bytes);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    out
}

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request")
}

fn analysis_parts<'a>() -> Vec<Part<'a>> {
    vec![
        Part {
            name: "image",
            file_name: Some("photo.png"),
            content_type: Some("image/png"),
            bytes: b"fake-png",
        },
        Part {
            name: "mask",
            file_name: Some("mask.mat"),
            content_type: Some("application/octet-stream"),
            bytes: b"fake-mat",
        },
        Part {
            name: "model",
            file_name: None,
            content_type: None,
            bytes: b"mobilenetv2_enhanced",
        },
    ]
}

fn test_app(failure_rate: f64, max_upload_bytes: usize) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let api = ApiContext {
        uploads: UploadStore::new(dir.path()),
        scripts: None,
        failure_rate,
    };
    (
        build_router(Arc::new(AppState { api }), max_upload_bytes),
        dir,
    )
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (app, _dir) = test_app(0.0, 1024);
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn models_route_ignores_failure_injection() {
    let (app, _dir) = test_app(1.0, 1024);
    let response = app
        .oneshot(Request::get("/api/models").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let envelope: Envelope<Vec<ModelDescriptor>> =
        serde_json::from_value(json_body(response).await).expect("envelope");
    assert!(!envelope.error);
    assert_eq!(envelope.data, default_models());
}

#[tokio::test]
async fn metrics_route_reports_simulated_failure_with_data() {
    let (app, _dir) = test_app(1.0, 1024);
    let response = app
        .oneshot(
            Request::get("/api/model-metrics")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let value = json_body(response).await;
    assert_eq!(value["error"], true);
    assert_eq!(value["simulated"], true);
    for key in ["accuracy", "precision", "recall", "f1Score", "auc"] {
        assert!(value["data"][key].is_string(), "missing {key}");
    }
}

#[tokio::test]
async fn predict_route_persists_uploads_and_echoes_model() {
    let (app, dir) = test_app(0.0, 1024 * 1024);
    let response = app
        .oneshot(multipart_request("/api/predict", &analysis_parts()))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let envelope: Envelope<PredictData> =
        serde_json::from_value(json_body(response).await).expect("envelope");
    assert!(!envelope.error);
    assert_eq!(envelope.data.model_used.as_deref(), Some("mobilenetv2_enhanced"));
    assert!(matches!(
        envelope.data.classification,
        Classification::Normal | Classification::Pathological
    ));

    let mut stored: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    stored.sort();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().any(|name| name.ends_with("-photo.png")));
    assert!(stored.iter().any(|name| name.ends_with("-mask.mat")));
}

#[tokio::test]
async fn gradcam_and_segment_routes_return_placeholder_urls() {
    let (app, _dir) = test_app(0.0, 1024 * 1024);
    let response = app
        .clone()
        .oneshot(multipart_request("/api/gradcam", &analysis_parts()))
        .await
        .expect("response");
    let value = json_body(response).await;
    assert_eq!(value["data"]["gradcamUrl"], "/api/placeholder-gradcam");
    assert_eq!(value["data"]["focusAreas"][0], "cortex");

    let response = app
        .oneshot(multipart_request("/api/segment", &analysis_parts()[..1]))
        .await
        .expect("response");
    let value = json_body(response).await;
    assert_eq!(value["data"]["maskUrl"], "/api/placeholder-mask");
}

#[tokio::test]
async fn malformed_multipart_is_a_validation_error() {
    let (app, _dir) = test_app(0.0, 1024 * 1024);
    let request = Request::post("/api/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from("this is not multipart"))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = json_body(response).await;
    assert_eq!(value["code"], "validation");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let (app, _dir) = test_app(0.0, 64);
    let big = vec![7u8; 4096];
    let parts = [Part {
        name: "image",
        file_name: Some("big.png"),
        content_type: Some("image/png"),
        bytes: &big,
    }];
    let body = multipart_body(&parts);
    let request = Request::post("/api/segment")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("content-length", body.len().to_string())
        .body(Body::from(body))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn oversized_upload_without_content_length_is_rejected() {
    let (app, _dir) = test_app(0.0, 64);
    let big = vec![7u8; 4096];
    let parts = [Part {
        name: "image",
        file_name: Some("big.png"),
        content_type: Some("image/png"),
        bytes: &big,
    }];
    let request = multipart_request("/api/segment", &parts);
    assert!(request.headers().get("content-length").is_none());

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let value = json_body(response).await;
    assert_eq!(value["code"], "payload_too_large");
}

#[tokio::test]
async fn generate_pdf_route_accepts_report_request() {
    let (app, _dir) = test_app(0.0, 1024 * 1024);
    let request = Request::post("/api/generate-pdf")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "analysisData": {
                    "classification": "pathological",
                    "confidence": 0.81,
                    "maskGenerated": false,
                    "metrics": { "auc": "0.945" },
                    "errors": []
                },
                "selectedModel": "mobilenetv2_default",
                "timestamp": "2024-05-01T10:00:00Z"
            })
            .to_string(),
        ))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let envelope: Envelope<ReportData> =
        serde_json::from_value(json_body(response).await).expect("envelope");
    assert!(!envelope.error);
    assert_eq!(envelope.data.pdf_url, "/api/placeholder-pdf");
    assert!(envelope.data.filename.starts_with("renal_analysis_"));
}

#[tokio::test]
async fn placeholder_routes_redirect_to_svg() {
    let (app, _dir) = test_app(0.0, 1024);
    let response = app
        .clone()
        .oneshot(
            Request::get("/api/placeholder-mask")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location")
        .to_string();
    assert!(location.starts_with("/placeholder.svg?"));

    let response = app
        .oneshot(Request::get(location).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).expect("type"),
        "image/svg+xml"
    );
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert!(String::from_utf8_lossy(&body).contains("Simulated Mask"));
}

#[tokio::test]
async fn uploads_are_served_statically() {
    let (app, dir) = test_app(0.0, 1024);
    std::fs::write(dir.path().join("123-photo.png"), b"png").expect("write");
    let response = app
        .oneshot(
            Request::get("/uploads/123-photo.png")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"png");
}
