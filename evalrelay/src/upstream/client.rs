//! reqwest client for the remote evaluation service.

use super::{CONTEXT_PASSWORD_HEADER, UploadedFile, UpstreamError};
use crate::config::{AskConfig, Config, InstructionFileConfig};
use anyhow::Context;
use reqwest::{
    Client, Response,
    header::ACCEPT,
    multipart::{Form, Part},
};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

const INSTRUCTION_FILE_MIME: &str = "text/markdown";

/// Relays requests to Rukh.
///
/// Cloning is cheap: the underlying `reqwest::Client` is reference counted, so one instance is
/// built at startup and shared through the application state.
#[derive(Debug, Clone)]
pub struct RukhClient {
    client: Client,
    base_url: Url,
    ask: AskConfig,
    instruction_file: InstructionFileConfig,
}

impl RukhClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.upstream.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.upstream.base_url.clone(),
            ask: config.ask.clone(),
            instruction_file: config.instruction_file.clone(),
        })
    }

    /// Builds `{base_url}/{segments...}`, percent-encoding each segment.
    ///
    /// A trailing empty segment on the base URL is dropped first, so `http://host/` and
    /// `http://host/prefix/` both behave like directories.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| UpstreamError::Url(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Send a file to `/ask` together with the fixed message, model and context fields.
    #[instrument(skip_all, fields(file_name = ?file.file_name, bytes = file.data.len()))]
    pub async fn ask(&self, file: UploadedFile) -> Result<Value, UpstreamError> {
        let url = self.endpoint(&["ask"])?;

        let mut part = Part::bytes(file.data.to_vec());
        if let Some(file_name) = file.file_name {
            part = part.file_name(file_name);
        }
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let form = Form::new()
            .text("message", self.ask.message.clone())
            .text("model", self.ask.model.clone())
            .text("context", self.ask.context.clone())
            .part("file", part);

        debug!("Relaying file to {}", url);
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        json_body(ensure_success(response).await?).await
    }

    /// Fetch the raw text of the instruction file.
    #[instrument(skip_all, fields(context = %self.instruction_file.context_name))]
    pub async fn fetch_instruction_file(&self) -> Result<String, UpstreamError> {
        let url = self.endpoint(&[
            "context",
            self.instruction_file.context_name.as_str(),
            "file",
            self.instruction_file.file_name.as_str(),
        ])?;

        debug!("Fetching instruction file from {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(CONTEXT_PASSWORD_HEADER, &self.instruction_file.context_password)
            .send()
            .await?;

        Ok(ensure_success(response).await?.text().await?)
    }

    /// Overwrite the instruction file with `content`.
    #[instrument(skip_all, fields(context = %self.instruction_file.context_name, bytes = content.len()))]
    pub async fn upload_instruction_file(&self, content: String) -> Result<Value, UpstreamError> {
        let url = self.endpoint(&["context", "upload"])?;

        let part = Part::bytes(content.into_bytes())
            .file_name(self.instruction_file.file_name.clone())
            .mime_str(INSTRUCTION_FILE_MIME)?;

        let form = Form::new()
            .text("contextName", self.instruction_file.context_name.clone())
            .text("fileDescription", self.instruction_file.description.clone())
            .part("file", part);

        debug!("Uploading instruction file to {}", url);
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTEXT_PASSWORD_HEADER, &self.instruction_file.context_password)
            .multipart(form)
            .send()
            .await?;

        json_body(ensure_success(response).await?).await
    }
}

/// Turn a non-2xx response into [`UpstreamError::Status`], keeping the body text.
async fn ensure_success(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(%status, "Upstream rejected request: {}", body);
    Err(UpstreamError::Status { status, body })
}

async fn json_body(response: Response) -> Result<Value, UpstreamError> {
    // Read as text first so a malformed body can be logged
    let body_text = response.text().await?;
    serde_json::from_str(&body_text).map_err(|e| {
        tracing::error!("Upstream response body was not JSON: {}", body_text);
        UpstreamError::Decode(e)
    })
}
