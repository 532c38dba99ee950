//! Pipeline errors rendered as HTTP responses.
//!
//! Session routes answer with an inline HTML fragment, job and admin routes
//! with JSON. Both use the status carried by the error category.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;

use seshu::SeshuError;

use crate::server::html::error_fragment;

/// Error rendered as an HTML fragment.
#[derive(Debug)]
pub struct HtmlError(pub SeshuError);

/// Error rendered as `{error, message}` JSON.
#[derive(Debug)]
pub struct JsonError(pub SeshuError);

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl From<SeshuError> for HtmlError {
    fn from(err: SeshuError) -> Self {
        Self(err)
    }
}

impl From<SeshuError> for JsonError {
    fn from(err: SeshuError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        log_error(&self.0, status);
        (status, Html(error_fragment(&self.0))).into_response()
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        log_error(&self.0, status);
        let body = ErrorBody {
            error: error_kind(&self.0),
            message: self.0.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn status_of(err: &SeshuError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Stable machine-readable name of the error category.
pub fn error_kind(err: &SeshuError) -> &'static str {
    match err {
        SeshuError::Validation { .. } => "validation",
        SeshuError::Auth => "auth",
        SeshuError::Upstream { .. } | SeshuError::Json(_) => "upstream",
        SeshuError::Conflict { .. } => "conflict",
        SeshuError::Store(_) => "store",
        SeshuError::Queue(_) => "queue",
        SeshuError::NotFound { .. } => "not_found",
    }
}

fn log_error(err: &SeshuError, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!(error = %err, status = status.as_u16(), "Request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "Request rejected");
    }
}
