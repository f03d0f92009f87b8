//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, routes)
//!     → request.rs (request ID, body decoding, validation, file extraction)
//!     → relay handlers (forward to the RAG backend)
//!     → response.rs (copy backend status/headers/body)
//!     → error.rs (failures rendered as JSON payloads)
//!     → Send to client
//! ```

pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use error::RelayError;
pub use request::{QuestionRequest, UploadedFile, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
