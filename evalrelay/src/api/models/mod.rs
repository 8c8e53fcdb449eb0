//! API request and response data models.
//!
//! Relay responses are mostly the remote service's JSON passed through untouched, so only the
//! shapes this service produces itself are modelled here.

pub mod instruction_file;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of every error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
