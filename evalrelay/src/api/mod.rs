//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for the relay endpoints and static pages
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Ask** (`/api/ask`): forward an uploaded Markdown/CSV file to the remote service
//! - **Instruction file** (`/api/instruction-file`): read or overwrite the remote instruction file
//!
//! All endpoints are documented with `utoipa`; the OpenAPI document is served at
//! `/api-docs/openapi.json` and rendered at `/docs`.

pub mod handlers;
pub mod models;
