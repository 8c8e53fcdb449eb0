//! HTTP handlers for the embedded browser pages.

use axum::{
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use crate::static_assets::Assets;

/// Serve an embedded page or asset.
///
/// `/instructions` resolves to `instructions.html`; any other unknown path outside `/api/`
/// falls back to the upload page.
#[instrument]
pub async fn serve_embedded_asset(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    if path == "api" || path.starts_with("api/") {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = if path.is_empty() || path.ends_with('/') {
        "index.html".to_string()
    } else {
        path.to_string()
    };

    let candidates = [path.clone(), format!("{path}.html")];
    for candidate in &candidates {
        if let Some(response) = asset_response(candidate) {
            return response;
        }
    }

    debug!("No embedded asset for {}, serving index.html", uri.path());
    asset_response("index.html").unwrap_or_else(|| StatusCode::NOT_FOUND.into_response())
}

fn asset_response(path: &str) -> Option<Response> {
    let content = Assets::get(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Some(
        (
            [
                (header::CONTENT_TYPE, mime.as_ref().to_string()),
                // Pages are tiny and change with every release
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
            content.data.into_owned(),
        )
            .into_response(),
    )
}
