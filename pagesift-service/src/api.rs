//! HTTP API for the page filtering service.
//!
//! - `POST /process-pdf` filters an uploaded PDF by a natural-language prompt
//! - `GET /health` reports liveness

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::ServiceError;
use crate::service::PageFilterService;

/// Suggested filename for the filtered document
pub const OUTPUT_FILENAME: &str = "output.pdf";

/// Application state
pub struct AppState {
    pub service: Arc<PageFilterService>,
    pub start_time: Instant,
}

/// Build the API router
pub fn router(service: Arc<PageFilterService>) -> Router {
    let max_body_size = service.config().limits.max_upload_bytes;

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/process-pdf",
            post(process_pdf_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
    uptime_seconds: u64,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// === PDF filtering ===

/// Filter an uploaded PDF
///
/// Multipart fields: `prompt` (text) and `pdf` (file). When no `pdf` part is
/// present, the first other part carrying a filename is used as the document.
///
/// A request that is not multipart at all has neither field and gets the
/// missing-input answer. A multipart body that fails while being read
/// (over the size limit, truncated, malformed) keeps the status the reader
/// reported.
async fn process_pdf_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServiceError> {
    let mut multipart = multipart.map_err(|e| ServiceError::InvalidRequest {
        message: e.body_text(),
    })?;

    let mut prompt: Option<String> = None;
    let mut pdf: Option<Bytes> = None;
    let mut other_file: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        let has_filename = field.file_name().is_some();

        match name.as_str() {
            "prompt" => {
                prompt = Some(field.text().await?);
            }
            "pdf" => {
                pdf = Some(field.bytes().await?);
            }
            _ if has_filename && other_file.is_none() => {
                other_file = Some(field.bytes().await?);
            }
            _ => debug!(field = %name, "Ignoring multipart field"),
        }
    }

    let filtered = state.service.process(prompt, pdf.or(other_file)).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", OUTPUT_FILENAME),
            ),
        ],
        filtered.bytes,
    )
        .into_response())
}
