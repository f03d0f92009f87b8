//! RAG backend access.
//!
//! # Data Flow
//! ```text
//! relay handler
//!     → client.rs (build outbound request, apply timeout, send)
//!     → BackendResponse (status, headers, body) or raw streaming response
//!     → relay handler copies it onto the client response
//! ```
//!
//! # Design Decisions
//! - One outbound attempt per inbound request, never retried
//! - Uploads use a dedicated client with a longer timeout
//! - The x-request-id of the inbound request is forwarded

pub mod client;

pub use client::{BackendClient, BackendError, BackendResponse};
