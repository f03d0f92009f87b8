//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Decode and validate question bodies
//! - Extract the uploaded file from a multipart form
//!
//! # Design Decisions
//! - Validation is a pure function over the decoded body, no shared validator
//! - Decoding (`QuestionInput`) and the validated shape (`QuestionRequest`) are
//!   separate types so only validated requests can be forwarded

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::error::RelayError;

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Multipart field holding the uploaded document.
pub const FILE_FIELD: &str = "file";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> Option<&HeaderValue> {
    headers.get(X_REQUEST_ID)
}

/// Request ID as text for logging.
pub fn request_id_str(headers: &HeaderMap) -> &str {
    request_id(headers)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Field-level validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

/// Question body as sent by the client, before validation.
#[derive(Debug, Default, Deserialize)]
struct QuestionInput {
    #[serde(default)]
    question: Option<String>,
}

/// A validated question, ready to be forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRequest {
    pub question: String,
}

impl QuestionRequest {
    /// Decode and validate an inbound body.
    pub fn from_body(body: &[u8]) -> Result<Self, RelayError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(RelayError::MalformedBody("empty body".to_string()));
        }

        let invalid = |e: serde_json::Error| {
            RelayError::MalformedBody(format!("invalid request body: {}", e))
        };

        // Only the first JSON value counts; duplicate keys keep the last one.
        let value = serde_json::Deserializer::from_slice(body)
            .into_iter::<Value>()
            .next()
            .unwrap_or(Ok(Value::Null))
            .map_err(invalid)?;

        let input = match value {
            Value::Null => QuestionInput::default(),
            value => serde_json::from_value(value).map_err(invalid)?,
        };

        Self::validate(input)
    }

    fn validate(input: QuestionInput) -> Result<Self, RelayError> {
        let mut errors = FieldErrors::default();

        let question = input.question.unwrap_or_default();
        if question.trim().is_empty() {
            errors.add("question", "field question is required and must not be blank");
        }

        if errors.is_empty() {
            Ok(Self { question })
        } else {
            Err(RelayError::Validation(errors))
        }
    }

    /// Serialize for the backend.
    pub fn to_json(&self) -> Result<Vec<u8>, RelayError> {
        serde_json::to_vec(self).map_err(|e| RelayError::Encoding(e.to_string()))
    }
}

/// The `file` part of an upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// Pull the first file part named `file` out of the form.
    ///
    /// Parts with another name, and a `file` part without a filename, are skipped.
    /// A file larger than `max_bytes` is rejected.
    pub async fn from_multipart(
        mut multipart: Multipart,
        max_bytes: usize,
    ) -> Result<Self, RelayError> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| RelayError::MalformedMultipart(e.body_text()))?
        {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            let Some(file_name) = field
                .file_name()
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
            else {
                continue;
            };
            let content_type = field.content_type().map(str::to_owned);
            let data = field
                .bytes()
                .await
                .map_err(|e| RelayError::MalformedMultipart(e.body_text()))?;

            if data.len() > max_bytes {
                // Drain the rest of the form so the connection ends cleanly.
                while let Ok(Some(_)) = multipart.next_field().await {}
                return Err(RelayError::MalformedMultipart(format!(
                    "file '{}' is {} bytes, limit is {}",
                    file_name,
                    data.len(),
                    max_bytes
                )));
            }

            return Ok(Self {
                file_name,
                content_type,
                data,
            });
        }

        Err(RelayError::MalformedMultipart(format!(
            "no file field named '{}' in form",
            FILE_FIELD
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_fields(err: RelayError) -> FieldErrors {
        match err {
            RelayError::Validation(fields) => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_question() {
        let req = QuestionRequest::from_body(br#"{"question":"what is rag?"}"#).unwrap();
        assert_eq!(req.question, "what is rag?");
        assert_eq!(req.to_json().unwrap(), br#"{"question":"what is rag?"}"#);
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let req =
            QuestionRequest::from_body(br#"{"question":"q","session":"abc"}"#).unwrap();
        assert_eq!(req.to_json().unwrap(), br#"{"question":"q"}"#);
    }

    #[test]
    fn test_empty_body() {
        for body in [&b""[..], b"   \n"] {
            match QuestionRequest::from_body(body) {
                Err(RelayError::MalformedBody(msg)) => assert_eq!(msg, "empty body"),
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            QuestionRequest::from_body(b"{not json"),
            Err(RelayError::MalformedBody(_))
        ));
        assert!(matches!(
            QuestionRequest::from_body(br#"{"question": 42}"#),
            Err(RelayError::MalformedBody(_))
        ));
    }

    #[test]
    fn test_blank_question_names_field() {
        for body in [
            &br#"{"question":""}"#[..],
            br#"{"question":"  \t "}"#,
            br#"{"question":null}"#,
            br#"{}"#,
        ] {
            let fields = validation_fields(QuestionRequest::from_body(body).unwrap_err());
            assert_eq!(fields.fields().collect::<Vec<_>>(), vec!["question"]);
            assert!(fields.get("question").unwrap().contains("required"));
        }
    }

    #[test]
    fn test_null_body_is_validation_error() {
        let fields = validation_fields(QuestionRequest::from_body(b"null").unwrap_err());
        assert_eq!(fields.fields().collect::<Vec<_>>(), vec!["question"]);
    }

    #[test]
    fn test_only_first_value_is_decoded() {
        let req = QuestionRequest::from_body(br#"{"question":"q"} {"x":1}"#).unwrap();
        assert_eq!(req.question, "q");
    }

    #[test]
    fn test_duplicate_key_keeps_last() {
        let req = QuestionRequest::from_body(br#"{"question":"a","question":"b"}"#).unwrap();
        assert_eq!(req.question, "b");
    }

    #[test]
    fn test_non_object_body_is_general_error() {
        assert!(matches!(
            QuestionRequest::from_body(br#"["question"]"#),
            Err(RelayError::MalformedBody(_))
        ));
    }

    #[test]
    fn test_request_id_generation() {
        let req = Request::builder().body(()).unwrap();
        let id = MakeRequestUuidV4.make_request_id(&req).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }

    #[test]
    fn test_request_id_str_fallback() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id_str(&headers), "unknown");
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc"));
        assert_eq!(request_id_str(&headers), "abc");
    }
}
