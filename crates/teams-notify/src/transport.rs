use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::TransportError;

/// Body returned by the webhook for a 2xx answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    /// Acknowledgement text; Teams answers `1` on success.
    pub text: String,
}

/// A client bound to one webhook URL.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn send(&self, payload: &Value) -> Result<WebhookResponse, TransportError>;
}

/// Creates a transport for a webhook URL.
pub trait TransportFactory: Send + Sync {
    fn connect(&self, webhook_url: &str) -> Box<dyn WebhookTransport>;
}

pub struct HttpTransportFactory {
    client: reqwest::Client,
}

impl HttpTransportFactory {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("teams-notify/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl TransportFactory for HttpTransportFactory {
    fn connect(&self, webhook_url: &str) -> Box<dyn WebhookTransport> {
        Box::new(HttpTransport {
            client: self.client.clone(),
            url: webhook_url.to_string(),
        })
    }
}

/// Posts the card as JSON with `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn send(&self, payload: &Value) -> Result<WebhookResponse, TransportError> {
        let resp = self.client.post(&self.url).json(payload).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "Webhook responded");

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(WebhookResponse { text })
    }
}
