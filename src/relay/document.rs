//! POST /api/document

use std::time::Instant;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use reqwest::multipart::{Form, Part};

use crate::http::request::{request_id, request_id_str, UploadedFile, FILE_FIELD};
use crate::http::response::relay_streaming;
use crate::http::server::{AppState, Inner};
use crate::http::RelayError;
use crate::observability::metrics;
use crate::relay::{log_failure, Operation};

/// Re-encode the uploaded file, forward it to `/add_pdf` and stream the reply.
pub async fn upload_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let start = Instant::now();
    let inner = state.snapshot();

    let response = match forward(&inner, &headers, multipart).await {
        Ok(response) => response,
        Err(err) => {
            let status = err.status_code();
            log_failure(
                Operation::UploadDocument,
                request_id_str(&headers),
                status,
                &err,
            );
            err.into_response()
        }
    };

    metrics::record_request(Operation::UploadDocument, response.status(), start);
    response
}

async fn forward(
    inner: &Inner,
    headers: &HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RelayError> {
    let multipart = multipart.map_err(|e| RelayError::MalformedMultipart(e.body_text()))?;
    let file =
        UploadedFile::from_multipart(multipart, inner.config.limits.max_upload_bytes).await?;

    tracing::info!(
        request_id = %request_id_str(headers),
        file_name = %file.file_name,
        content_type = file.content_type.as_deref().unwrap_or(""),
        bytes = file.data.len(),
        backend = %inner.backend.base_url(),
        "Forwarding document to RAG backend"
    );

    let form = encode_upload(file)?;
    let reply = inner.backend.add_pdf(form, request_id(headers)).await?;
    tracing::debug!(status = %reply.status(), "Backend accepted upload");

    Ok(relay_streaming(reply))
}

/// Build a fresh single-part form carrying the uploaded file unchanged.
pub fn encode_upload(file: UploadedFile) -> Result<Form, RelayError> {
    let length = file.data.len() as u64;
    let mut part = Part::stream_with_length(file.data, length).file_name(file.file_name);

    if let Some(content_type) = file.content_type.as_deref().filter(|ct| !ct.is_empty()) {
        part = part.mime_str(content_type).map_err(|e| {
            RelayError::Encoding(format!("invalid content type '{}': {}", content_type, e))
        })?;
    }

    Ok(Form::new().part(FILE_FIELD, part))
}
