//! HTTP request handlers for all API endpoints.
//!
//! Each relay handler reshapes the incoming request, performs exactly one call through
//! [`crate::upstream::RukhClient`], and returns the remote response or an [`Error`].
//!
//! # Handler Modules
//!
//! - [`ask`]: Forward an uploaded file to the remote `/ask` endpoint
//! - [`instruction_file`]: Read and overwrite the remote instruction file
//! - [`static_assets`]: Embedded browser pages
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Result`]. A non-success remote status is passed through with
//! the remote body in the message; every other failure becomes a generic 500.

pub mod ask;
pub mod instruction_file;
pub mod static_assets;

use crate::errors::Error;
use crate::upstream::UpstreamError;

/// Map an outbound failure to the error the caller sees.
///
/// `prefix` precedes the remote body text when the remote service rejected the call;
/// `operation` names the generic failure ("Failed to {operation}") for everything else.
pub(crate) fn relay_error(err: UpstreamError, prefix: &str, operation: &str) -> Error {
    match err {
        UpstreamError::Status { status, body } => Error::Upstream {
            status,
            message: format!("{prefix}: {body}"),
        },
        other => Error::internal(operation, other),
    }
}
