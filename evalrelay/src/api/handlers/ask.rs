use crate::AppState;
use crate::api::handlers::relay_error;
use crate::errors::{Error, Result};
use crate::upstream::UploadedFile;
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use serde_json::Value;

const FILE_FIELD: &str = "file";
const OPERATION: &str = "process request";

#[utoipa::path(
    post,
    path = "/api/ask",
    tag = "ask",
    summary = "Ask about a file",
    description = "Forward a Markdown or CSV file to the evaluation service and return its answer unchanged.",
    request_body(
        content_type = "multipart/form-data",
        description = "Multipart body with a `file` field"
    ),
    responses(
        (status = 200, description = "The evaluation service's JSON response, passed through unchanged"),
        (status = 400, description = "No file provided", body = crate::api::models::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::api::models::ErrorResponse),
        (status = 500, description = "Failed to process request", body = crate::api::models::ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn ask(State(state): State<AppState>, multipart: std::result::Result<Multipart, MultipartRejection>) -> Result<Json<Value>> {
    let max_upload_size = state.config.ask.max_upload_size;

    let mut multipart = multipart.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge { limit: max_upload_size }
        } else {
            Error::internal(OPERATION, anyhow::anyhow!("Invalid multipart request: {}", rejection.body_text()))
        }
    })?;

    let file = read_file_field(&mut multipart)
        .await
        .map_err(|e| multipart_error(e, max_upload_size))?
        .ok_or_else(|| Error::BadRequest {
            message: "No file provided".to_string(),
        })?;

    tracing::info!(
        file_name = ?file.file_name,
        bytes = file.data.len(),
        "Relaying uploaded file"
    );

    let body = state
        .rukh
        .ask(file)
        .await
        .map_err(|e| relay_error(e, "Rukh API error", OPERATION))?;

    Ok(Json(body))
}

/// Read fields until the first one named `file`. Other fields are skipped.
async fn read_file_field(multipart: &mut Multipart) -> std::result::Result<Option<UploadedFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            data,
        }));
    }

    Ok(None)
}

fn multipart_error(err: MultipartError, max_upload_size: usize) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit: max_upload_size }
    } else {
        Error::internal(OPERATION, err)
    }
}
