//! Outbound calls to the n8n ingestion webhook.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::WebhookConfig;

const MAX_RESPONSE_TEXT: usize = 1000;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("N8N_WEBHOOK_URL is not configured")]
    NotConfigured,

    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Result of forwarding a payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ForwardOutcome {
    pub status: u16,
    pub ok: bool,
    pub text: String,
}

/// Result of probing the webhook host.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub status: u16,
    pub target: String,
}

pub struct WebhookClient {
    url: Option<Url>,
    forward: Client,
    probe: Client,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Result<Self, WebhookError> {
        let forward = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;
        let probe = Client::builder().timeout(config.probe_timeout).build()?;

        Ok(Self { url: config.url.clone(), forward, probe })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// The probe target: everything before `/webhook`, or the URL itself.
    pub fn health_target(&self) -> Option<String> {
        self.url.as_ref().map(|url| health_target(url.as_str()))
    }

    /// POST `payload` unchanged and report what came back.
    pub async fn forward(&self, payload: &Value) -> Result<ForwardOutcome, WebhookError> {
        let url = self.url.as_ref().ok_or(WebhookError::NotConfigured)?;

        let response = self.forward.post(url.clone()).json(payload).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        tracing::info!("Webhook answered {} ({} bytes)", status, text.len());

        Ok(ForwardOutcome {
            status,
            ok: status < 300,
            text: truncate_chars(&text, MAX_RESPONSE_TEXT),
        })
    }

    pub async fn probe(&self) -> Result<ProbeOutcome, WebhookError> {
        let target = self.health_target().ok_or(WebhookError::NotConfigured)?;

        let response = self.probe.get(&target).send().await?;
        let status = response.status().as_u16();
        tracing::debug!("Webhook probe {} answered {}", target, status);

        Ok(ProbeOutcome { ok: status < 500, status, target })
    }
}

fn health_target(url: &str) -> String {
    match url.find("/webhook") {
        Some(index) => url[..index].to_string(),
        None => url.to_string(),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(url: Option<&str>) -> WebhookConfig {
        WebhookConfig {
            url: url.map(|u| Url::parse(u).unwrap()),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn health_target_strips_webhook_path() {
        assert_eq!(health_target("https://n8n.local/webhook/abc-123"), "https://n8n.local");
        assert_eq!(health_target("https://n8n.local/webhook-test/abc"), "https://n8n.local");
        assert_eq!(health_target("https://n8n.local/hooks/abc"), "https://n8n.local/hooks/abc");
    }

    #[test]
    fn unconfigured_client_has_no_target() {
        let client = WebhookClient::new(&config(None)).unwrap();
        assert!(!client.is_configured());
        assert_eq!(client.health_target(), None);
    }

    #[tokio::test]
    async fn unconfigured_forward_is_an_error() {
        let client = WebhookClient::new(&config(None)).unwrap();
        assert!(matches!(client.forward(&Value::Null).await, Err(WebhookError::NotConfigured)));
        assert!(matches!(client.probe().await, Err(WebhookError::NotConfigured)));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("abc", 1000), "abc");
        assert_eq!(truncate_chars(&"x".repeat(1500), 1000).len(), 1000);
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }
}
