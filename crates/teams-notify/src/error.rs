use thiserror::Error;

/// Errors returned by [`crate::notifier::Notifier::notify`].
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A caller-supplied precondition was violated; no request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The webhook could not be reached or did not acknowledge the card.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing webhook URL")]
    MissingWebhookUrl,

    #[error("missing payload")]
    MissingPayload,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The transport rejected the request.
    #[error("webhook delivery failed")]
    Transport(#[from] TransportError),

    /// The request went through but the webhook returned no acknowledgement.
    #[error("empty response from webhook")]
    EmptyResponse,
}

/// Errors raised by a [`crate::transport::WebhookTransport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Webhook answered with a non-success status
    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors raised while merging a caller-supplied raw card.
#[derive(Debug, Error)]
pub enum RawPayloadError {
    #[error("raw payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("raw payload must be a JSON object")]
    NotAnObject,
}
