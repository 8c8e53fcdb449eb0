use clap::Parser;
use evalrelay::{Application, Config, config::Args, telemetry};
use tokio::signal;

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("SIGTERM handler unavailable, relying on Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolves on SIGTERM or Ctrl+C.
async fn shutdown_signal() {
    let received = tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => "Ctrl+C",
            Err(e) => {
                tracing::warn!("Ctrl+C handler failed: {}", e);
                "Ctrl+C handler failure"
            }
        },
        _ = terminate() => "SIGTERM",
    };
    tracing::info!("Received {}, shutting down gracefully...", received);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // reqwest is built without a default provider
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("A rustls crypto provider was already installed"))?;

    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration in {} is valid.", args.config);
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::debug!(config_file = %args.config, "Configuration loaded");

    Application::new(config)?.serve(shutdown_signal()).await
}
