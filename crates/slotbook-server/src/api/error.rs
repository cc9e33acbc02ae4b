//! HTTP error mapping.
//!
//! Callers see three kinds of failure: a bad request, a taken slot and an
//! opaque internal error. Store details never leave the process; they are
//! logged here instead.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::ledger::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("This slot is already taken")]
    SlotTaken,

    #[error("{0}")]
    NotFound(String),

    /// Message shown to the caller; the cause has already been logged.
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Convert a ledger failure, logging store errors under `context`.
    pub fn from_ledger(err: LedgerError, context: &'static str) -> Self {
        match err {
            LedgerError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            LedgerError::SlotTaken { .. } => Self::SlotTaken,
            LedgerError::EventNotFound(id) => Self::NotFound(format!("Event {id} not found")),
            LedgerError::StoreUnavailable(e) => {
                error!(error = %e, "{context}");
                Self::Internal(context)
            }
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::SlotTaken => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::SlotTaken => "SLOT_TAKEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}
