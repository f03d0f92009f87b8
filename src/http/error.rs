//! Relay error taxonomy and its client-visible mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;
use crate::http::request::FieldErrors;

/// Everything that can go wrong while relaying one request.
///
/// None of these escape the handler: each becomes a status code and a JSON
/// error payload.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Body empty or not decodable.
    #[error("{0}")]
    MalformedBody(String),

    /// Body decoded but one or more fields failed validation.
    #[error("request validation failed")]
    Validation(FieldErrors),

    /// The backend could not be reached.
    #[error("{0}")]
    BackendUnreachable(#[source] BackendError),

    /// The backend's body could not be read.
    #[error("{0}")]
    BackendRead(#[source] BackendError),

    /// Upload form unparseable or missing the file part.
    #[error("{0}")]
    MalformedMultipart(String),

    /// The outbound body could not be constructed.
    #[error("{0}")]
    Encoding(String),
}

impl From<BackendError> for RelayError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Read(_) => RelayError::BackendRead(err),
            BackendError::Unreachable { .. } | BackendError::Build(_) => {
                RelayError::BackendUnreachable(err)
            }
        }
    }
}

/// JSON error payload.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub status: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<&'a FieldErrors>,
}

impl RelayError {
    /// Default status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MalformedBody(_)
            | RelayError::Validation(_)
            | RelayError::MalformedMultipart(_) => StatusCode::BAD_REQUEST,
            RelayError::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            RelayError::BackendRead(_) | RelayError::Encoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-friendly name, used as a log and metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MalformedBody(_) => "malformed_body",
            RelayError::Validation(_) => "validation",
            RelayError::BackendUnreachable(_) => "backend_unreachable",
            RelayError::BackendRead(_) => "backend_read",
            RelayError::MalformedMultipart(_) => "malformed_multipart",
            RelayError::Encoding(_) => "encoding",
        }
    }

    pub fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            status: "Error",
            error: self.to_string(),
            fields: match self {
                RelayError::Validation(fields) => Some(fields),
                _ => None,
            },
        }
    }

    /// Render with an explicit status instead of [`RelayError::status_code`].
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self.body())).into_response()
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        self.into_response_with_status(status)
    }
}
