use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Body returned for a request that is missing the prompt or the PDF.
pub const MISSING_INPUT_MESSAGE: &str = "Missing prompt or PDF file.";

/// Body returned when the upload exceeds the configured size limit.
pub const UPLOAD_TOO_LARGE_MESSAGE: &str = "Uploaded file too large.";

/// Body returned when the multipart body itself cannot be read.
pub const MALFORMED_UPLOAD_MESSAGE: &str = "Malformed multipart upload.";

/// Body returned for every server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Failed to read multipart upload")]
    Upload(#[from] MultipartError),

    #[error("Document error")]
    Document(#[from] DocumentError),

    #[error("Upload storage error")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// PDF parsing and reassembly errors
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to parse PDF")]
    Parse(#[source] lopdf::Error),

    #[error("Page index {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("Failed to serialize filtered PDF")]
    Reassembly(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Upload storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to write upload to {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read upload from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown upload handle: {id}")]
    UnknownHandle { id: String },
}

/// Chat-completion client errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Connection failed to language model at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Completion request failed (status {status}): {message}")]
    Request { status: u16, message: String },

    #[error("Invalid response from language model")]
    InvalidResponse {
        #[source]
        source: reqwest::Error,
    },

    #[error("Language model returned no choices")]
    EmptyResponse,
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Upload(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Server-side detail never leaves the process.
    fn public_message(&self) -> &'static str {
        match self {
            ServiceError::InvalidRequest { .. } => MISSING_INPUT_MESSAGE,
            ServiceError::Upload(e) => match e.status() {
                StatusCode::PAYLOAD_TOO_LARGE => UPLOAD_TOO_LARGE_MESSAGE,
                status if status.is_client_error() => MALFORMED_UPLOAD_MESSAGE,
                _ => INTERNAL_ERROR_MESSAGE,
            },
            _ => INTERNAL_ERROR_MESSAGE,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, detail = %error_chain(&self), "Request failed");
        } else if let ServiceError::Upload(e) = &self {
            warn!(%status, error = %e.body_text(), "Rejected upload");
        }

        let response = ErrorResponse {
            error: self.public_message().to_string(),
        };

        (status, Json(response)).into_response()
    }
}

/// Render an error and all of its sources as a single line.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
