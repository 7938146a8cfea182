//! Error to HTTP response mapping.
//!
//! Every failure is rendered as `{"error": message, "code": code}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::error::{AccessError, Error, ErrorKind, StateError};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
        ErrorKind::AuthenticationFailed => StatusCode::UNAUTHORIZED,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Machine-readable code, finer than [`ErrorKind`] where clients need it.
fn code_for(err: &Error) -> &'static str {
    match err {
        Error::Access(AccessError::SeparationOfDuty) => "separation_of_duty",
        Error::Access(AccessError::UserBanned { .. }) => "user_banned",
        Error::State(StateError::InvalidState(_)) => "invalid_state",
        Error::State(StateError::DuplicateRequest) => "duplicate_request",
        Error::State(StateError::AlreadyMember) => "already_member",
        Error::State(StateError::AlreadyExists(_)) => "already_exists",
        other => other.kind().code(),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = if kind == ErrorKind::Internal {
            error!(error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: message,
            code: code_for(&self),
        };
        (status_for(kind), Json(body)).into_response()
    }
}
