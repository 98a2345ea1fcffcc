// =============================================================================
// Notification sinks
// =============================================================================
//
// The sink contract is deliberately narrow: a recipient list and a rendered
// subject/body go in, a delivery-success boolean comes out. Nothing here ever
// raises into the scanning core, and the core never calls a sink directly —
// dispatch happens at the service layer.
// =============================================================================

pub mod webhook;

use tracing::info;

pub use webhook::WebhookSink;

/// Common contract for alert delivery backends.
pub trait AlertSink {
    /// Deliver a rendered alert; `true` means every recipient was handed off.
    fn deliver(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> impl std::future::Future<Output = bool> + Send;
}

// =============================================================================
// LogSink
// =============================================================================

/// Fallback sink that writes the alert to the log and reports success.
///
/// Used when no relay URL is configured, so a fresh checkout still surfaces
/// triggers somewhere visible.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    async fn deliver(&self, recipients: &[String], subject: &str, body: &str) -> bool {
        info!(
            recipients = recipients.len(),
            subject,
            %body,
            "alert (log sink)"
        );
        true
    }
}

impl AlertSink for WebhookSink {
    async fn deliver(&self, recipients: &[String], subject: &str, body: &str) -> bool {
        WebhookSink::deliver(self, recipients, subject, body).await
    }
}

// =============================================================================
// AlertRouter
// =============================================================================

/// Runtime-selected sink: webhook relay when a URL is configured, log
/// otherwise.
#[derive(Debug, Clone)]
pub enum AlertRouter {
    Webhook(WebhookSink),
    Log(LogSink),
}

impl AlertRouter {
    pub fn from_webhook_url(url: Option<&str>) -> Self {
        match url {
            Some(u) if !u.trim().is_empty() => Self::Webhook(WebhookSink::new(u.trim())),
            _ => Self::Log(LogSink),
        }
    }
}

impl AlertSink for AlertRouter {
    async fn deliver(&self, recipients: &[String], subject: &str, body: &str) -> bool {
        match self {
            Self::Webhook(sink) => AlertSink::deliver(sink, recipients, subject, body).await,
            Self::Log(sink) => sink.deliver(recipients, subject, body).await,
        }
    }
}
