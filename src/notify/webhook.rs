// =============================================================================
// Webhook alert sink — HTTP relay delivery
// =============================================================================
//
// Delivers rendered alerts by POSTing a JSON payload to a configured relay
// URL, one request per recipient. The relay owns the actual mail transport;
// this process only reports whether every hand-off was accepted.
// =============================================================================

use serde_json::json;
use tracing::{info, warn};

/// Alert sink that POSTs each alert to an HTTP relay endpoint.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            url: url.into(),
            client,
        }
    }

    /// Build the relay payload for a single recipient.
    pub fn payload(recipient: &str, subject: &str, body: &str) -> serde_json::Value {
        json!({
            "to": recipient,
            "subject": subject,
            "body": body,
        })
    }

    /// Deliver `body` to every recipient through the relay.
    ///
    /// Returns `true` only when every recipient hand-off succeeded. Transport
    /// failures are logged and collapsed into the boolean; nothing propagates
    /// to the caller.
    pub async fn deliver(&self, recipients: &[String], subject: &str, body: &str) -> bool {
        if recipients.is_empty() {
            warn!("alert requested but no recipients configured");
            return false;
        }

        let mut delivered = 0usize;

        for recipient in recipients {
            let payload = Self::payload(recipient, subject, body);
            match self.client.post(&self.url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => delivered += 1,
                Ok(resp) => {
                    warn!(recipient = %recipient, status = %resp.status(), "alert relay rejected hand-off");
                }
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "alert relay request failed");
                }
            }
        }

        info!(
            delivered,
            total = recipients.len(),
            subject,
            "alert delivery finished"
        );
        delivered == recipients.len()
    }
}
