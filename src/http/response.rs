//! Response relay.
//!
//! # Responsibilities
//! - Copy a backend reply (status, headers, body) onto the client response
//! - Stream upload replies without buffering
//!
//! # Design Decisions
//! - Header copy is key-by-key: a backend key replaces every value already
//!   set under that name
//! - Hop-by-hop headers are never copied
//! - Upload replies relay only the content type

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::Response;
use futures_util::TryStreamExt;

use crate::backend::BackendResponse;

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name) || name.as_str() == "keep-alive"
}

/// Overwrite `dst` with every end-to-end header in `src`.
pub fn copy_headers(dst: &mut HeaderMap, src: &HeaderMap) {
    for name in src.keys() {
        if is_hop_by_hop(name) {
            continue;
        }
        dst.remove(name);
        for value in src.get_all(name) {
            dst.append(name.clone(), value.clone());
        }
    }
}

/// Build the client response from a fully read backend reply.
pub fn relay_buffered(reply: BackendResponse) -> Response {
    let mut response = Response::new(Body::from(reply.body));
    *response.status_mut() = reply.status;
    copy_headers(response.headers_mut(), &reply.headers);
    response
}

/// Build the client response from an unread backend reply, streaming its body.
pub fn relay_streaming(reply: reqwest::Response) -> Response {
    let status = reply.status();
    let content_type = reply.headers().get(header::CONTENT_TYPE).cloned();

    let stream = reply.bytes_stream().inspect_err(|e| {
        tracing::warn!(error = %e, "Backend body stream failed mid-relay");
    });

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    response
}
