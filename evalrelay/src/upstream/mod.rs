//! Outbound side of the relay: talking to the remote evaluation service (Rukh).
//!
//! Every relay handler performs exactly one call through [`RukhClient`]. The client owns URL
//! construction, the fixed form fields and headers, and classifies failures into an
//! [`UpstreamError`] so that each handler can decide which message the caller sees.

mod client;

pub use client::RukhClient;

use axum::http::StatusCode;
use bytes::Bytes;
use thiserror::Error;

/// Header carrying the shared context secret on instruction-file calls.
pub const CONTEXT_PASSWORD_HEADER: &str = "x-context-password";

/// A file received from a caller, forwarded byte for byte.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The remote service answered with a non-success status
    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request could not be sent, or the response body could not be read
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body was not the expected JSON
    #[error("upstream returned an invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The outbound URL could not be built from the configured base URL
    #[error("invalid upstream URL: {0}")]
    Url(String),
}
