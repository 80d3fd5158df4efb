//! Paste-service submission for long evaluation output

use async_trait::async_trait;
use std::time::Duration;

use anyhow::{anyhow, Context};
use evalbot_sandbox::run_timed;
use url::Url;

/// One paste to submit.
#[derive(Debug, Clone)]
pub struct PasteRequest {
    pub title: String,
    pub author: Option<String>,
    pub content: String,
}

/// External paste service, injected so the pipeline can be tested without a
/// network.
#[async_trait]
pub trait PasteSink: Send + Sync {
    /// Submit content; returns the public URL on success.
    async fn submit(&self, paste: PasteRequest) -> anyhow::Result<String>;
}

/// HTTP paste client posting JSON to a submit endpoint.
///
/// Expects a JSON response carrying `status` and, on success, `url`
/// (absolute or relative to the endpoint).
pub struct HttpPasteClient {
    endpoint: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpPasteClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PasteSink for HttpPasteClient {
    async fn submit(&self, paste: PasteRequest) -> anyhow::Result<String> {
        let author = paste.author.as_deref().unwrap_or("evalbot");
        let body = serde_json::json!({
            "author": author,
            "title": paste.title,
            "content": paste.content,
            "private": true,
        });

        // A hung paste service must not wedge the response pipeline.
        let response = run_timed(
            self.client.post(self.endpoint.clone()).json(&body).send(),
            Some(self.timeout),
        )
        .await
        .map_err(|err| anyhow!("paste submission timed out: {}", err))?
        .context("paste request failed")?;

        let reply: serde_json::Value = response
            .json()
            .await
            .context("paste response was not JSON")?;

        if reply.get("status").and_then(|s| s.as_str()) == Some("error") {
            let message = reply
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("<no message>");
            return Err(anyhow!("paste service error: {}", message));
        }

        let raw_url = reply
            .get("url")
            .and_then(|u| u.as_str())
            .ok_or_else(|| anyhow!("paste response carried no url"))?;

        let resolved = self
            .endpoint
            .join(raw_url)
            .context("paste response url was invalid")?;
        Ok(resolved.to_string())
    }
}
