//! Post GitHub Actions workflow run status to a Microsoft Teams channel.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod metadata;
pub mod notifier;
pub mod orchestrator;
pub mod payload;
pub mod transport;

pub use context::{Status, WorkflowContext};
pub use error::{DeliveryError, NotifyError, ValidationError};
pub use notifier::Notifier;
pub use payload::{NotificationPayload, PayloadBuilder};
