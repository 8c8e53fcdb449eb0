//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `EVALRELAY_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `EVALRELAY_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `EVALRELAY_UPSTREAM__BASE_URL=http://localhost:8080` sets the `upstream.base_url` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use evalrelay::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Relaying to {}", config.upstream.base_url);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Upstream**: `upstream.base_url`, `upstream.request_timeout` - the remote evaluation service
//! - **Ask**: `ask.*` - fixed fields sent with every file upload, and the upload size limit
//! - **Instruction file**: `instruction_file.*` - remote context, credential and file name
//! - **CORS**: `cors.allowed_origins`, `cors.max_age`
//! - **Features**: `enable_metrics`, `enable_otel_export` - Optional feature toggles

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "EVALRELAY_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// The remote evaluation service every relay forwards to
    pub upstream: UpstreamConfig,
    /// Fixed fields for the file-ask relay
    pub ask: AskConfig,
    /// Remote location of the instruction file
    pub instruction_file: InstructionFileConfig,
    /// CORS configuration for browser clients served from another origin
    pub cors: CorsConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Remote service connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL of the remote service, e.g. `https://rukh.w3hc.org`
    pub base_url: Url,
    /// Per-request timeout. When unset the HTTP client's default applies.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
}

/// Fields attached to every outbound `/ask` call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AskConfig {
    pub message: String,
    pub model: String,
    pub context: String,
    /// Maximum accepted size of an incoming upload request, in bytes
    pub max_upload_size: usize,
}

/// Where the instruction file lives on the remote service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstructionFileConfig {
    /// Remote context (document namespace) holding the file
    pub context_name: String,
    /// Shared secret sent as `x-context-password`
    pub context_password: String,
    /// File name within the context
    pub file_name: String,
    /// Description sent along with every upload
    pub description: String,
    /// Maximum accepted size of an incoming update request, in bytes
    pub max_content_size: usize,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests. Empty means same-origin only.
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upstream: UpstreamConfig::default(),
            ask: AskConfig::default(),
            instruction_file: InstructionFileConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://rukh.w3hc.org").unwrap(),
            request_timeout: None,
        }
    }
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            message: "-".to_string(),
            model: "anthropic".to_string(),
            context: "eval".to_string(),
            max_upload_size: 10 * 1024 * 1024,
        }
    }
}

impl Default for InstructionFileConfig {
    fn default() -> Self {
        Self {
            context_name: "eval".to_string(),
            context_password: "eval".to_string(),
            file_name: "instruction-file.md".to_string(),
            description: "Instructions for evaluation".to_string(),
            max_content_size: 10 * 1024 * 1024,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        match self.upstream.base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::InvalidConfig {
                    message: format!("upstream.base_url must use http or https, got '{other}'"),
                });
            }
        }

        let required = [
            ("ask.message", &self.ask.message),
            ("ask.model", &self.ask.model),
            ("ask.context", &self.ask.context),
            ("instruction_file.context_name", &self.instruction_file.context_name),
            ("instruction_file.file_name", &self.instruction_file.file_name),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidConfig {
                    message: format!("{key} must not be empty"),
                });
            }
        }

        if self.instruction_file.file_name.contains('/') {
            return Err(Error::InvalidConfig {
                message: "instruction_file.file_name must be a bare file name without '/'".to_string(),
            });
        }

        for (key, limit) in [
            ("ask.max_upload_size", self.ask.max_upload_size),
            ("instruction_file.max_content_size", self.instruction_file.max_content_size),
        ] {
            if limit == 0 {
                return Err(Error::InvalidConfig {
                    message: format!("{key} must be greater than zero"),
                });
            }
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // EVALRELAY_CONFIG names the file itself, it is not a config key
            .merge(Env::prefixed("EVALRELAY_").ignore(&["config"]).split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
