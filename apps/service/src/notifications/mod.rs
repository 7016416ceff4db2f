//! Outbound alert delivery.
//!
//! The monitor hands each alert or recovery to a [`Notifier`] as a single
//! preformatted line. Delivery is best effort: failures are reported to the
//! caller, which logs them and moves on.

use thiserror::Error;
use tracing::info;

pub mod webhook;

pub use webhook::WebhookNotifier;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// A channel alert messages are pushed to
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), SenderError>;
}

/// Used when no webhook is configured
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), SenderError> {
        info!(notification = %message, "No webhook configured, notification logged only");
        Ok(())
    }
}
