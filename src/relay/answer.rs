//! POST /api/answer

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};

use crate::http::request::{request_id, request_id_str, QuestionRequest};
use crate::http::response::relay_buffered;
use crate::http::server::{AppState, Inner};
use crate::http::RelayError;
use crate::observability::metrics;
use crate::relay::{log_failure, Operation};

/// Validate the question, forward it to `/query` and relay the reply.
pub async fn answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start = Instant::now();
    let inner = state.snapshot();

    let response = match forward(&inner, &headers, body).await {
        Ok(response) => response,
        Err(err) => {
            let status = err.status_code();
            log_failure(Operation::Answer, request_id_str(&headers), status, &err);
            err.into_response()
        }
    };

    metrics::record_request(Operation::Answer, response.status(), start);
    response
}

async fn forward(
    inner: &Inner,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, RelayError> {
    let body = body.map_err(|e| RelayError::MalformedBody(e.body_text()))?;
    let question = QuestionRequest::from_body(&body)?;
    let payload = question.to_json()?;

    tracing::info!(
        request_id = %request_id_str(headers),
        backend = %inner.backend.base_url(),
        "Forwarding question to RAG backend"
    );

    let reply = inner.backend.query(payload, request_id(headers)).await?;
    tracing::debug!(status = %reply.status, bytes = reply.body.len(), "Backend answered");

    Ok(relay_buffered(reply))
}
