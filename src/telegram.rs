//! Telegram transport - Bot API long polling and message copying
//!
//! Thin client over the Bot API: `getUpdates` long polling for channel
//! posts (new and edited) and `copyMessage` into the destination chat.
//! The pipeline depends only on the [`MessageForwarder`] trait so tests
//! can substitute a mock transport.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tracing::debug;

/// Long-poll duration requested from the Bot API (seconds).
const POLL_TIMEOUT_SECS: u64 = 40;

/// HTTP client timeout; must exceed the long-poll duration.
const HTTP_TIMEOUT_SECS: u64 = 50;

/// Telegram transport errors
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bot API error: {0}")]
    Api(String),
}

/// One inbound channel post, reduced to what the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i64,
    /// Message body or caption; empty for media-only posts.
    pub text: String,
}

/// Copy-semantics forward into a destination chat.
///
/// The sole transport operation the pipeline depends on.
#[async_trait]
pub trait MessageForwarder: Send + Sync {
    async fn copy_message(
        &self,
        from_chat_id: i64,
        to_chat_id: i64,
        message_id: i64,
    ) -> Result<(), TelegramError>;
}

// ---- Bot API wire types ----

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    channel_post: Option<RawMessage>,
    edited_channel_post: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    message_id: i64,
    chat: Chat,
    text: Option<String>,
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
}

/// Bot API client.
pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
    /// Next getUpdates offset (last seen update_id + 1).
    offset: AtomicI64,
}

impl TelegramClient {
    /// Create a client for the given bot token.
    pub fn new(bot_token: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base: format!("https://api.telegram.org/bot{bot_token}"),
            offset: AtomicI64::new(0),
        }
    }

    /// Verify credentials and return the bot's username.
    pub async fn get_me(&self) -> Result<String, TelegramError> {
        let resp: ApiResponse<BotUser> = self
            .http
            .get(format!("{}/getMe", self.base))
            .send()
            .await?
            .json()
            .await?;
        let user = unwrap_api(resp)?;
        Ok(user.username.unwrap_or_else(|| "unknown".to_string()))
    }

    /// Discard updates that accumulated while the process was down.
    ///
    /// Mirrors drop-pending-updates-on-start behavior: one short poll at
    /// offset -1 fast-forwards past everything already queued.
    pub async fn drop_pending_updates(&self) -> Result<(), TelegramError> {
        let resp: ApiResponse<Vec<Update>> = self
            .http
            .get(format!("{}/getUpdates", self.base))
            .query(&[("offset", "-1"), ("timeout", "0")])
            .send()
            .await?
            .json()
            .await?;
        let updates = unwrap_api(resp)?;
        if let Some(last) = updates.last() {
            self.offset.store(last.update_id + 1, Ordering::Relaxed);
            debug!(dropped_through = last.update_id, "Dropped pending updates");
        }
        Ok(())
    }

    /// Long-poll for the next batch of channel posts.
    ///
    /// Returns an empty vec when the poll window elapses without traffic.
    /// Media-only posts come through with an empty text body so the
    /// pipeline can still forward them.
    pub async fn next_updates(&self) -> Result<Vec<InboundMessage>, TelegramError> {
        let offset = self.offset.load(Ordering::Relaxed);
        let resp: ApiResponse<Vec<Update>> = self
            .http
            .get(format!("{}/getUpdates", self.base))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                (
                    "allowed_updates",
                    r#"["channel_post","edited_channel_post"]"#.to_string(),
                ),
            ])
            .send()
            .await?
            .json()
            .await?;
        let updates = unwrap_api(resp)?;

        let mut messages = Vec::with_capacity(updates.len());
        for update in updates {
            self.offset.store(update.update_id + 1, Ordering::Relaxed);
            let raw = match update.channel_post.or(update.edited_channel_post) {
                Some(raw) => raw,
                None => continue,
            };
            let text = raw.text.or(raw.caption).unwrap_or_default();
            messages.push(InboundMessage {
                chat_id: raw.chat.id,
                message_id: raw.message_id,
                text,
            });
        }
        Ok(messages)
    }
}

#[async_trait]
impl MessageForwarder for TelegramClient {
    async fn copy_message(
        &self,
        from_chat_id: i64,
        to_chat_id: i64,
        message_id: i64,
    ) -> Result<(), TelegramError> {
        let resp: ApiResponse<serde_json::Value> = self
            .http
            .post(format!("{}/copyMessage", self.base))
            .json(&serde_json::json!({
                "chat_id": to_chat_id,
                "from_chat_id": from_chat_id,
                "message_id": message_id,
            }))
            .send()
            .await?
            .json()
            .await?;
        unwrap_api(resp)?;
        Ok(())
    }
}

fn unwrap_api<T>(resp: ApiResponse<T>) -> Result<T, TelegramError> {
    if !resp.ok {
        return Err(TelegramError::Api(
            resp.description
                .unwrap_or_else(|| "unspecified Bot API failure".to_string()),
        ));
    }
    resp.result
        .ok_or_else(|| TelegramError::Api("ok response without result".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_batch_deserializes_posts_and_captions() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "channel_post":
                    {"message_id": 1, "chat": {"id": -100}, "text": "New Load Bid: 5"}},
                {"update_id": 11, "channel_post":
                    {"message_id": 2, "chat": {"id": -100}, "caption": "photo caption"}},
                {"update_id": 12, "edited_channel_post":
                    {"message_id": 1, "chat": {"id": -100}, "text": "edited"}}
            ]
        }"#;
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(body).expect("deserializes");
        let updates = unwrap_api(resp).expect("ok");
        assert_eq!(updates.len(), 3);
        assert_eq!(
            updates[1]
                .channel_post
                .as_ref()
                .and_then(|m| m.caption.as_deref()),
            Some("photo caption")
        );
        assert!(updates[2].edited_channel_post.is_some());
    }

    #[test]
    fn api_error_carries_description() {
        let body = r#"{"ok": false, "result": null, "description": "Unauthorized"}"#;
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(body).expect("deserializes");
        match unwrap_api(resp) {
            Err(TelegramError::Api(msg)) => assert_eq!(msg, "Unauthorized"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
