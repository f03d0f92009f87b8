//! HTTP client for the RAG backend.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use reqwest::multipart::Form;
use thiserror::Error;

use crate::config::{BackendConfig, TimeoutConfig};
use crate::http::request::X_REQUEST_ID;

/// Backend path answering questions.
pub const QUERY_PATH: &str = "/query";
/// Backend path clearing the document store.
pub const RESET_PATH: &str = "/reset";
/// Backend path ingesting a document.
pub const ADD_PDF_PATH: &str = "/add_pdf";

/// Errors raised while talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The HTTP client could not be constructed.
    #[error("failed to build backend client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request could not be delivered (connect, DNS, timeout before headers).
    #[error("backend unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be read to the end.
    #[error("failed to read backend response: {0}")]
    Read(#[source] reqwest::Error),
}

/// A fully read backend reply.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BackendResponse {
    /// Read the whole body of a backend response.
    pub async fn read(response: reqwest::Response) -> Result<Self, BackendError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(BackendError::Read)?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }
}

/// Client wrapper issuing the three backend calls.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    upload_client: reqwest::Client,
    backend: BackendConfig,
}

impl BackendClient {
    /// Build the clients for the given backend and timeouts.
    pub fn new(backend: BackendConfig, timeouts: &TimeoutConfig) -> Result<Self, BackendError> {
        let connect = Duration::from_secs(timeouts.connect_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(connect)
            .timeout(Duration::from_secs(timeouts.request_secs))
            .no_proxy()
            .build()
            .map_err(BackendError::Build)?;
        let upload_client = reqwest::Client::builder()
            .connect_timeout(connect)
            .timeout(Duration::from_secs(timeouts.upload_secs))
            .no_proxy()
            .build()
            .map_err(BackendError::Build)?;

        Ok(Self {
            client,
            upload_client,
            backend,
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.backend.base_url
    }

    /// POST a serialized question to `/query` and read the reply.
    pub async fn query(
        &self,
        body: Vec<u8>,
        request_id: Option<&HeaderValue>,
    ) -> Result<BackendResponse, BackendError> {
        let url = self.backend.endpoint(QUERY_PATH);
        let request = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
        let response = send(with_request_id(request, request_id), url).await?;
        BackendResponse::read(response).await
    }

    /// POST an empty body to `/reset` and read the reply.
    pub async fn reset(
        &self,
        request_id: Option<&HeaderValue>,
    ) -> Result<BackendResponse, BackendError> {
        let url = self.backend.endpoint(RESET_PATH);
        let request = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json");
        let response = send(with_request_id(request, request_id), url).await?;
        BackendResponse::read(response).await
    }

    /// POST a multipart form to `/add_pdf`.
    ///
    /// The response is returned unread so the caller can stream its body.
    pub async fn add_pdf(
        &self,
        form: Form,
        request_id: Option<&HeaderValue>,
    ) -> Result<reqwest::Response, BackendError> {
        let url = self.backend.endpoint(ADD_PDF_PATH);
        let request = self.upload_client.post(&url).multipart(form);
        send(with_request_id(request, request_id), url).await
    }
}

fn with_request_id(
    request: reqwest::RequestBuilder,
    request_id: Option<&HeaderValue>,
) -> reqwest::RequestBuilder {
    match request_id {
        Some(id) => request.header(X_REQUEST_ID, id.clone()),
        None => request,
    }
}

async fn send(
    request: reqwest::RequestBuilder,
    url: String,
) -> Result<reqwest::Response, BackendError> {
    tracing::debug!(url = %url, "Sending backend request");
    request
        .send()
        .await
        .map_err(|source| BackendError::Unreachable { url, source })
}
