//! Notification webhook - best-effort fan-out after a committed upsert
//!
//! At-most-once by design: one POST with a bounded timeout, no retry queue.
//! A failed notification is logged and recorded, never unwound into the
//! already-committed write.

use serde::Serialize;
use thiserror::Error;

/// Timeout for a single webhook call.
const NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Shared-secret header carried when an API key is configured.
const WEBHOOK_KEY_HEADER: &str = "x-webhook-key";

/// Notifier errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Webhook request body.
#[derive(Debug, Serialize)]
struct NewBidPayload<'a> {
    #[serde(rename = "bidNumber")]
    bid_number: &'a str,
}

/// HTTP client for the downstream notification webhook.
#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl Notifier {
    /// Create a notifier for the given webhook URL.
    pub fn new(url: &str, api_key: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            url: url.to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    /// Notify the downstream consumer that a bid was upserted.
    ///
    /// Only HTTP 200 counts as success; any other status, timeout, or
    /// transport error surfaces as a (non-fatal) `NotifyError`.
    pub async fn bid_upserted(&self, bid_number: &str) -> Result<(), NotifyError> {
        let mut req = self
            .http
            .post(&self.url)
            .json(&NewBidPayload { bid_number });

        if let Some(key) = &self.api_key {
            req = req.header(WEBHOOK_KEY_HEADER, key);
        }

        let resp = req.send().await?;
        match resp.status() {
            reqwest::StatusCode::OK => Ok(()),
            status => Err(NotifyError::Status(status)),
        }
    }

    /// Webhook URL, for log lines.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_camel_case_bid_number() {
        let body = serde_json::to_string(&NewBidPayload {
            bid_number: "87642971",
        })
        .expect("serializes");
        assert_eq!(body, r#"{"bidNumber":"87642971"}"#);
    }
}
