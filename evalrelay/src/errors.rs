use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

use crate::api::models::ErrorResponse;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Missing or invalid client input
    #[error("{message}")]
    BadRequest { message: String },

    /// Incoming upload is larger than the configured limit
    #[error("Upload exceeds the maximum size of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The remote service answered with a non-success status.
    ///
    /// The status is passed through to the caller unchanged.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// Generic relay failure; the cause is logged but never returned to the caller
    #[error("Failed to {operation}")]
    Internal {
        operation: String,
        cause: Option<anyhow::Error>,
    },

    /// Configuration rejected at startup
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    pub fn internal(operation: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Error::Internal {
            operation: operation.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Upstream { status, .. } => *status,
            Error::Internal { .. } | Error::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message sent to the caller. The cause of an internal error never leaks into it.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Internal { cause: Some(cause), .. } => {
                tracing::error!("{}: {:#}", self, cause);
            }
            Error::Internal { cause: None, .. } | Error::InvalidConfig { .. } => {
                tracing::error!("Internal service error: {}", self);
            }
            Error::Upstream { status, .. } => {
                tracing::warn!(status = %status, "Upstream error: {}", self);
            }
            Error::BadRequest { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = ErrorResponse { error: self.user_message() };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;
