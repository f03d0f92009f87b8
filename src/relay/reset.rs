//! POST /api/reset

use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};

use crate::http::request::{request_id, request_id_str};
use crate::http::response::relay_buffered;
use crate::http::server::AppState;
use crate::http::RelayError;
use crate::observability::metrics;
use crate::relay::{log_failure, Operation};

/// Ask the backend to clear its document store and relay the reply.
pub async fn reset(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let start = Instant::now();
    let inner = state.snapshot();

    tracing::info!(
        request_id = %request_id_str(&headers),
        backend = %inner.backend.base_url(),
        "Forwarding reset to RAG backend"
    );

    let response = match inner.backend.reset(request_id(&headers)).await {
        Ok(reply) => relay_buffered(reply),
        Err(e) => {
            let err = RelayError::from(e);
            let status = failure_status(&err, inner.config.relay.unify_unreachable_status);
            log_failure(Operation::Reset, request_id_str(&headers), status, &err);
            err.into_response_with_status(status)
        }
    };

    metrics::record_request(Operation::Reset, response.status(), start);
    response
}

/// Reset reports every backend failure as 500 unless unified with answer/upload.
fn failure_status(err: &RelayError, unify_unreachable: bool) -> StatusCode {
    match err {
        RelayError::BackendUnreachable(_) if unify_unreachable => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_backend_failures_stay_500() {
        let err = RelayError::Encoding("bad".into());
        assert_eq!(failure_status(&err, true), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure_status(&err, false), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
