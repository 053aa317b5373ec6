use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{VizConfig, MAX_TEXT_LENGTH};
use crate::error::{VizError, VizResult};
use crate::stream::{consume, StreamEvent, StreamOutcome};
use crate::types::{AnalyzeRequest, HealthStatus};

use super::traits::AnalysisBackend;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Analysis service reached over HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    max_text_length: usize,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_text_length: MAX_TEXT_LENGTH,
        }
    }

    /// Backend whose client-side length check follows `config`, so it
    /// agrees with the session's own check.
    pub fn from_config(base_url: impl Into<String>, config: &VizConfig) -> Self {
        Self::with_base_url(base_url).with_max_text_length(config.max_text_length)
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_max_text_length(mut self, max: usize) -> Self {
        self.max_text_length = max;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn validate(&self, text: &str) -> VizResult<()> {
        if text.trim().is_empty() {
            return Err(VizError::EmptyInput);
        }
        let len = text.chars().count();
        if len > self.max_text_length {
            return Err(VizError::InputTooLong {
                len,
                max: self.max_text_length,
            });
        }
        Ok(())
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull the `error` field out of a JSON error body, else return it as-is.
fn error_body(body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or(body)
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze(
        &self,
        text: &str,
        sink: mpsc::UnboundedSender<StreamEvent>,
    ) -> VizResult<()> {
        self.validate(text)?;

        let url = format!("{}/analyze", self.base_url);
        info!(%url, chars = text.chars().count(), "Starting analysis request");

        let response = self
            .client
            .post(&url)
            .header("accept", "text/event-stream")
            .json(&AnalyzeRequest {
                text: text.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = error_body(response.text().await.unwrap_or_default());
            warn!(status, %body, "Analysis request rejected");
            return Err(VizError::Transport { status, body });
        }

        let summary = consume(response, &sink).await;
        match &summary.outcome {
            StreamOutcome::Finished => info!(
                messages = summary.messages,
                malformed = summary.malformed,
                "Analysis stream finished"
            ),
            StreamOutcome::Failed(reason) => debug!(%reason, "Analysis stream failed"),
        }
        Ok(())
    }

    async fn health(&self) -> VizResult<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VizError::Transport { status, body });
        }
        Ok(response.json().await?)
    }
}
