//! Test utilities: application construction against a mock upstream, and helpers to inspect the
//! outbound requests the relay made.

use crate::config::{Config, UpstreamConfig};
use axum_test::TestServer;
use bytes::Bytes;
use std::sync::Once;
use std::time::Duration;
use wiremock::MockServer;

/// reqwest is built without a default rustls provider; `main` installs one, tests do it here.
pub fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

/// Default configuration pointed at `upstream_url` (usually a `MockServer::uri()`).
pub fn create_test_config(upstream_url: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        upstream: UpstreamConfig {
            base_url: upstream_url.parse().expect("Invalid upstream URL in test"),
            request_timeout: Some(Duration::from_secs(5)),
        },
        enable_metrics: false,
        enable_otel_export: false,
        ..Default::default()
    }
}

pub fn create_test_server(upstream_url: &str) -> TestServer {
    create_test_server_with_config(create_test_config(upstream_url))
}

pub fn create_test_server_with_config(config: Config) -> TestServer {
    install_crypto_provider();
    crate::Application::new(config)
        .expect("Failed to create application")
        .into_test_server()
}

pub async fn received_requests(mock_server: &MockServer) -> Vec<wiremock::Request> {
    mock_server.received_requests().await.unwrap_or_default()
}

/// One decoded part of an outbound multipart body.
#[derive(Debug)]
pub struct MultipartField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl MultipartField {
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.data).expect("Multipart field is not UTF-8")
    }
}

/// Decode a captured `multipart/form-data` request body, preserving field order.
pub async fn decode_multipart(request: &wiremock::Request) -> Vec<MultipartField> {
    let content_type = request
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .expect("Request has no content-type header");
    let boundary = multer::parse_boundary(content_type).expect("Request is not multipart");

    let body = Bytes::from(request.body.clone());
    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("Malformed multipart body") {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());
        let data = field.bytes().await.expect("Failed to read multipart field");
        fields.push(MultipartField {
            name,
            file_name,
            content_type,
            data,
        });
    }
    fields
}
