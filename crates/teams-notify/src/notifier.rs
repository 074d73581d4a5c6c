use std::time::Duration;

use serde_json::Value;

use crate::error::{DeliveryError, NotifyError, TransportError, ValidationError};
use crate::transport::{HttpTransportFactory, TransportFactory};

pub struct Notifier {
    factory: Box<dyn TransportFactory>,
}

impl Notifier {
    pub fn new(factory: Box<dyn TransportFactory>) -> Self {
        Self { factory }
    }

    /// Notifier backed by `reqwest`.
    pub fn http(timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self::new(Box::new(HttpTransportFactory::new(timeout)?)))
    }

    /// Send `payload` once. Never retries and never logs.
    pub async fn notify(
        &self,
        webhook_url: Option<&str>,
        payload: Option<&Value>,
    ) -> Result<(), NotifyError> {
        let webhook_url = webhook_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ValidationError::MissingWebhookUrl)?;
        let payload = payload
            .filter(|p| !p.is_null())
            .ok_or(ValidationError::MissingPayload)?;

        let transport = self.factory.connect(webhook_url);
        let response = transport
            .send(payload)
            .await
            .map_err(DeliveryError::Transport)?;

        if response.text.trim().is_empty() {
            return Err(DeliveryError::EmptyResponse.into());
        }
        Ok(())
    }
}
