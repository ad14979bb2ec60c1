//! Error types for the document generation API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docfill_core::DocfillError;
use thiserror::Error;

use crate::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("File not found!")]
    FileNotFound(String),

    #[error(transparent)]
    Generation(#[from] DocfillError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::FileNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Generation(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Generation(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::FileNotFound(name) => tracing::warn!("Download of missing file '{}'", name),
            ApiError::InvalidRequest(msg) => tracing::warn!("Rejected request: {}", msg),
            other => tracing::error!("Request failed: {}", other),
        }

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
