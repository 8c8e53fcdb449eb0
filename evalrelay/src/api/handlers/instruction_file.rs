use crate::AppState;
use crate::api::handlers::relay_error;
use crate::api::models::instruction_file::{InstructionFileContent, InstructionFileUpdate};
use crate::errors::{Error, Result};
use axum::{
    Json,
    extract::{State, rejection::BytesRejection},
    http::StatusCode,
};
use bytes::Bytes;
use serde_json::Value;

#[utoipa::path(
    get,
    path = "/api/instruction-file",
    tag = "instruction-file",
    summary = "Get instruction file",
    description = "Fetch the instruction file from the evaluation service's context and return its raw text.",
    responses(
        (status = 200, description = "Current instruction file content", body = InstructionFileContent),
        (status = 500, description = "Failed to fetch instruction file", body = crate::api::models::ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_instruction_file(State(state): State<AppState>) -> Result<Json<InstructionFileContent>> {
    let content = state
        .rukh
        .fetch_instruction_file()
        .await
        .map_err(|e| relay_error(e, "Failed to fetch instruction file", "fetch instruction file"))?;

    Ok(Json(InstructionFileContent { content }))
}

#[utoipa::path(
    post,
    path = "/api/instruction-file",
    tag = "instruction-file",
    summary = "Update instruction file",
    description = "Overwrite the instruction file on the evaluation service. The remote response is returned unchanged.",
    request_body = InstructionFileUpdate,
    responses(
        (status = 200, description = "The evaluation service's JSON response, passed through unchanged"),
        (status = 400, description = "No content provided", body = crate::api::models::ErrorResponse),
        (status = 413, description = "Request body too large", body = crate::api::models::ErrorResponse),
        (status = 500, description = "Failed to update instruction file", body = crate::api::models::ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_instruction_file(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<Value>> {
    const OPERATION: &str = "update instruction file";

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge {
                limit: state.config.instruction_file.max_content_size,
            }
        } else {
            Error::internal(OPERATION, anyhow::anyhow!("Failed to read request body: {}", rejection.body_text()))
        }
    })?;

    // Parsed by hand: an unreadable body is a relay failure, not a 4xx rejection
    let update: InstructionFileUpdate = serde_json::from_slice(&body).map_err(|e| Error::internal(OPERATION, e))?;

    let content = update.into_content().ok_or_else(|| Error::BadRequest {
        message: "No content provided".to_string(),
    })?;

    tracing::info!(bytes = content.len(), "Updating instruction file");

    let response = state
        .rukh
        .upload_instruction_file(content)
        .await
        .map_err(|e| relay_error(e, "Failed to update instruction file", OPERATION))?;

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_config, create_test_server, create_test_server_with_config, decode_multipart, received_requests};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_instruction_file_wraps_raw_text() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/context/eval/file/instruction-file.md"))
            .and(header("x-context-password", "eval"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# Rules\n\n- be strict\n"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let server = create_test_server(&mock_server.uri());
        let response = server.get("/api/instruction-file").await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Value>(), json!({ "content": "# Rules\n\n- be strict\n" }));
    }

    #[tokio::test]
    async fn test_get_instruction_file_propagates_upstream_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("File not found"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let server = create_test_server(&mock_server.uri());
        let response = server.get("/api/instruction-file").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            response.json::<Value>(),
            json!({ "error": "Failed to fetch instruction file: File not found" })
        );
    }

    #[tokio::test]
    async fn test_get_instruction_file_with_unreachable_upstream() {
        let server = create_test_server("http://127.0.0.1:1");
        let response = server.get("/api/instruction-file").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body, json!({ "error": "Failed to fetch instruction file" }));
        assert!(body.get("content").is_none());
    }

    #[tokio::test]
    async fn test_update_instruction_file_uploads_exact_content() {
        let mock_server = MockServer::start().await;
        let remote = json!({ "message": "File uploaded successfully" });
        Mock::given(method("POST"))
            .and(path("/context/upload"))
            .and(header("x-context-password", "eval"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(remote.clone()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let server = create_test_server(&mock_server.uri());
        let response = server.post("/api/instruction-file").json(&json!({ "content": "Hello" })).await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Value>(), remote);

        let requests = received_requests(&mock_server).await;
        assert_eq!(requests.len(), 1);

        let fields = decode_multipart(&requests[0]).await;
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["contextName", "fileDescription", "file"]);

        assert_eq!(fields[0].text(), "eval");
        assert_eq!(fields[1].text(), "Instructions for evaluation");

        let file = &fields[2];
        assert_eq!(file.file_name.as_deref(), Some("instruction-file.md"));
        assert_eq!(file.content_type.as_deref(), Some("text/markdown"));
        assert_eq!(file.text(), "Hello");
    }

    #[tokio::test]
    async fn test_update_instruction_file_requires_content() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let server = create_test_server(&mock_server.uri());

        for body in [
            json!({}),
            json!({ "content": null }),
            json!({ "content": "" }),
            json!({ "content": false }),
            json!({ "content": 0 }),
        ] {
            let response = server.post("/api/instruction-file").json(&body).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<Value>(), json!({ "error": "No content provided" }));
        }

        assert!(received_requests(&mock_server).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_instruction_file_propagates_upstream_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/context/upload"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid context password"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let server = create_test_server(&mock_server.uri());
        let response = server.post("/api/instruction-file").json(&json!({ "content": "Hello" })).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<Value>(),
            json!({ "error": "Failed to update instruction file: Invalid context password" })
        );
    }

    #[tokio::test]
    async fn test_update_instruction_file_with_malformed_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let server = create_test_server(&mock_server.uri());
        let response = server.post("/api/instruction-file").text("content=Hello").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<Value>(), json!({ "error": "Failed to update instruction file" }));
    }

    #[tokio::test]
    async fn test_update_instruction_file_uploads_number_as_text() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/context/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let server = create_test_server(&mock_server.uri());
        let response = server.post("/api/instruction-file").json(&json!({ "content": 42 })).await;

        response.assert_status(StatusCode::OK);
        let requests = received_requests(&mock_server).await;
        let fields = decode_multipart(&requests[0]).await;
        let file = fields.iter().find(|f| f.name == "file").unwrap();
        assert_eq!(file.text(), "42");
    }

    #[tokio::test]
    async fn test_update_instruction_file_with_non_json_success_is_generic_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/context/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let server = create_test_server(&mock_server.uri());
        let response = server.post("/api/instruction-file").json(&json!({ "content": "Hello" })).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<Value>(), json!({ "error": "Failed to update instruction file" }));
    }

    #[tokio::test]
    async fn test_update_instruction_file_accepts_content_above_default_axum_limit() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/context/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let server = create_test_server(&mock_server.uri());
        let content = "a".repeat(3 * 1024 * 1024);
        let response = server.post("/api/instruction-file").json(&json!({ "content": &content })).await;

        response.assert_status(StatusCode::OK);
        let requests = received_requests(&mock_server).await;
        let fields = decode_multipart(&requests[0]).await;
        let file = fields.iter().find(|f| f.name == "file").unwrap();
        assert_eq!(file.data.len(), content.len());
    }

    #[tokio::test]
    async fn test_update_instruction_file_rejects_oversized_body_as_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let mut config = create_test_config(&mock_server.uri());
        config.instruction_file.max_content_size = 1024;
        let server = create_test_server_with_config(config);

        let response = server
            .post("/api/instruction-file")
            .json(&json!({ "content": "a".repeat(4096) }))
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.json::<Value>(),
            json!({ "error": "Upload exceeds the maximum size of 1024 bytes" })
        );
        assert!(received_requests(&mock_server).await.is_empty());
    }
}
