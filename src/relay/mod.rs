//! Relay handlers: the three operations forwarded to the RAG backend.
//!
//! # Data Flow
//! ```text
//! POST /api/answer   → validate question → POST {base}/query   → relay status + headers + body
//! POST /api/reset    →                     POST {base}/reset   → relay status + headers + body
//! POST /api/document → extract `file`, re-encode → POST {base}/add_pdf → relay status + content type, stream body
//! ```
//!
//! Each handler loads the configuration snapshot once, makes a single backend
//! attempt and records one metrics sample.

mod answer;
mod document;
mod reset;

use axum::http::StatusCode;

use crate::http::RelayError;

pub use answer::answer;
pub use document::{encode_upload, upload_document};
pub use reset::reset;

/// Relay operation, used as a log field and metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Answer,
    Reset,
    UploadDocument,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Answer => "answer",
            Operation::Reset => "reset",
            Operation::UploadDocument => "upload_document",
        }
    }
}

/// Log a failed relay at a level matching who is at fault.
fn log_failure(operation: Operation, request_id: &str, status: StatusCode, err: &RelayError) {
    if status.is_client_error() {
        tracing::warn!(
            request_id = %request_id,
            operation = operation.as_str(),
            kind = err.kind(),
            status = status.as_u16(),
            error = %err,
            "Rejected request"
        );
    } else {
        tracing::error!(
            request_id = %request_id,
            operation = operation.as_str(),
            kind = err.kind(),
            status = status.as_u16(),
            error = %err,
            "Relay failed"
        );
    }
}
