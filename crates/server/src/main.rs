use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::ModelDescriptor,
    error::{ApiError, ApiException, ErrorCode},
    protocol::{
        Envelope, GradcamData, ModelMetrics, PlaceholderPdfNote, PredictData, ReportData,
        ReportRequest, SegmentData,
    },
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir};
use tracing::{error, info};

mod api;
mod app_state;
mod config;
mod placeholder;
mod scripts;
mod simulate;
mod uploads;

use api::ApiContext;
use app_state::AppState;
use config::{load_settings, prepare_upload_dir, BackendMode};
use placeholder::PlaceholderQuery;
use scripts::ScriptRunner;
use uploads::{read_analysis_form, UploadStore};

type HttpResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let upload_dir = prepare_upload_dir(&settings.upload_dir).map_err(|error| {
        error!(
            upload_dir = %settings.upload_dir.display(),
            %error,
            "failed to prepare upload directory; verify permissions"
        );
        error
    })?;

    let scripts = match settings.backend_mode {
        BackendMode::Simulated => None,
        BackendMode::Scripts => Some(ScriptRunner::new(
            settings.scripts_dir.clone(),
            settings.script_interpreter.clone(),
        )),
    };
    info!(
        mode = ?settings.backend_mode,
        failure_rate = settings.simulated_failure_rate,
        upload_dir = %upload_dir.display(),
        "analysis backend configured"
    );

    let api = ApiContext {
        uploads: UploadStore::new(upload_dir),
        scripts,
        failure_rate: settings.simulated_failure_rate,
    };
    let app = build_router(Arc::new(AppState { api }), settings.max_upload_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let uploads = ServeDir::new(state.api.uploads.root());
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/segment", post(http_segment))
        .route("/api/predict", post(http_predict))
        .route("/api/gradcam", post(http_gradcam))
        .route("/api/generate-pdf", post(http_generate_pdf))
        .route("/api/model-metrics", get(http_model_metrics))
        .route("/api/models", get(http_models))
        .route("/api/placeholder-mask", get(placeholder_mask))
        .route("/api/placeholder-gradcam", get(placeholder_gradcam))
        .route("/api/placeholder-pdf", get(placeholder_pdf))
        .route("/placeholder.svg", get(placeholder_svg))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn reject(err: ApiException) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err.into()))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_segment(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> HttpResult<Envelope<SegmentData>> {
    let form = read_analysis_form(&state.api.uploads, multipart)
        .await
        .map_err(reject)?;
    Ok(Json(api::segment(&state.api, form.image.as_ref()).await))
}

async fn http_predict(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> HttpResult<Envelope<PredictData>> {
    let form = read_analysis_form(&state.api.uploads, multipart)
        .await
        .map_err(reject)?;
    Ok(Json(api::predict(&state.api, &form).await))
}

async fn http_gradcam(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> HttpResult<Envelope<GradcamData>> {
    let form = read_analysis_form(&state.api.uploads, multipart)
        .await
        .map_err(reject)?;
    Ok(Json(api::gradcam(&state.api, &form)))
}

async fn http_generate_pdf(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReportRequest>,
) -> Json<Envelope<ReportData>> {
    Json(api::generate_report(&state.api, &request).await)
}

async fn http_model_metrics(State(state): State<Arc<AppState>>) -> Json<Envelope<ModelMetrics>> {
    Json(api::model_metrics(&state.api))
}

async fn http_models() -> Json<Envelope<Vec<ModelDescriptor>>> {
    Json(api::list_models())
}

async fn placeholder_mask() -> Redirect {
    Redirect::temporary("/placeholder.svg?height=400&width=400&text=Simulated+Mask")
}

async fn placeholder_gradcam() -> Redirect {
    Redirect::temporary("/placeholder.svg?height=400&width=400&text=Simulated+Grad-CAM")
}

async fn placeholder_pdf() -> Json<PlaceholderPdfNote> {
    Json(PlaceholderPdfNote {
        message: "Simulated PDF generated successfully".to_string(),
        download_url: "#".to_string(),
        note: "A production deployment would download the real PDF file here".to_string(),
    })
}

async fn placeholder_svg(Query(query): Query<PlaceholderQuery>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/svg+xml")],
        placeholder::render_svg(&query),
    )
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
