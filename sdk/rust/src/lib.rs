//! Client for the RAG gateway's HTTP API.

mod client;

pub use client::{AnswerResponse, ErrorResponse, GatewayClient, QuestionRequest};
