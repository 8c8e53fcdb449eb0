//! # evalrelay: a thin relay in front of the Rukh evaluation service
//!
//! `evalrelay` serves two browser pages and the small API behind them. Users upload a Markdown or
//! CSV file to be evaluated, or view and edit the "instruction file" that steers the evaluation.
//! Neither operation is handled locally: every API request is reshaped into a fixed outbound
//! request, sent to the remote service, and the remote answer is handed back.
//!
//! ## Request Flow
//!
//! - `POST /api/ask` reads the multipart `file` field and forwards it to the remote `/ask`
//!   endpoint together with fixed `message`, `model` and `context` fields.
//! - `GET /api/instruction-file` fetches the file from the configured remote context and wraps its
//!   text as `{"content": ...}`.
//! - `POST /api/instruction-file` uploads `{"content": ...}` to the remote context as a markdown
//!   file, replacing the previous version.
//!
//! A remote non-success status is passed through with the remote body in the error message. Any
//! other failure is logged and reported as a generic 500. There are no retries and no local state
//! beyond the configuration and a shared HTTP client.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use evalrelay::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = evalrelay::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     evalrelay::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config)?
//!         .serve(async {
//!             tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!         })
//!         .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod errors;
mod openapi;
mod static_assets;
pub mod telemetry;
pub mod upstream;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::upstream::RukhClient;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Json, Router,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// Both fields are immutable after startup; cloning is cheap.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .rukh(rukh_client)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub rukh: RukhClient,
}

/// Create CORS layer from configuration. Returns `None` when no origins are configured.
fn create_cors_layer(config: &Config) -> anyhow::Result<Option<CorsLayer>> {
    if config.cors.allowed_origins.is_empty() {
        return Ok(None);
    }

    let mut origins = Vec::new();
    let mut wildcard = false;
    for origin in &config.cors.allowed_origins {
        match origin {
            CorsOrigin::Wildcard => wildcard = true,
            CorsOrigin::Url(url) => origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?),
        }
    }

    let mut cors = if wildcard {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(Some(cors))
}

/// Build the application router with all endpoints and middleware.
///
/// - Relay routes under `/api`
/// - Health check, OpenAPI document and API reference UI
/// - Embedded browser pages as the fallback
/// - Optional Prometheus metrics, CORS, and request tracing
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route(
            "/api/ask",
            post(api::handlers::ask::ask).layer(DefaultBodyLimit::max(state.config.ask.max_upload_size)),
        )
        .route(
            "/api/instruction-file",
            get(api::handlers::instruction_file::get_instruction_file)
                .post(api::handlers::instruction_file::update_instruction_file)
                .layer(DefaultBodyLimit::max(state.config.instruction_file.max_content_size)),
        )
        .with_state(state.clone());

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .fallback(api::handlers::static_assets::serve_embedded_asset);

    if let Some(cors_layer) = create_cors_layer(&state.config)? {
        router = router.layer(cors_layer);
    }

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router and configuration.
///
/// 1. **Create**: [`Application::new`] builds the upstream client and the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves, then flushes telemetry
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting evalrelay with configuration: {:#?}", config);

        let rukh = RukhClient::new(&config)?;
        let app_state = AppState::builder().config(config.clone()).rukh(rukh).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "evalrelay listening on http://{}, relaying to {}",
            bind_addr, self.config.upstream.base_url
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
