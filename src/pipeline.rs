//! Pipeline orchestrator
//!
//! Runs one inbound message through forward -> parse -> state update ->
//! upsert -> notify. Every stage is isolated: a forward failure still
//! allows parsing, a parse miss still counts the forward, a persistence
//! failure leaves the in-memory state updated, and a notifier failure
//! never reverts the committed write. The terminal state is always
//! reached - no retries, no stalls.

use crate::notify::Notifier;
use crate::parser::parse_bid;
use crate::state::{MessageEvent, SharedState};
use crate::store::{BidRow, BidStore};
use crate::telegram::{InboundMessage, MessageForwarder};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Fixed active-window duration applied to every ingested bid (minutes).
pub const BID_WINDOW_MINUTES: i64 = 30;

/// Per-message orchestrator. One instance per process.
pub struct Pipeline<F: MessageForwarder> {
    forwarder: Arc<F>,
    store: Option<BidStore>,
    notifier: Option<Notifier>,
    state: SharedState,
    source_chat_id: i64,
    target_chat_id: i64,
    window_minutes: i64,
}

impl<F: MessageForwarder> Pipeline<F> {
    pub fn new(
        forwarder: Arc<F>,
        store: Option<BidStore>,
        notifier: Option<Notifier>,
        state: SharedState,
        source_chat_id: i64,
        target_chat_id: i64,
    ) -> Self {
        Self {
            forwarder,
            store,
            notifier,
            state,
            source_chat_id,
            target_chat_id,
            window_minutes: BID_WINDOW_MINUTES,
        }
    }

    /// Override the bid window (default 30 minutes).
    pub fn with_window_minutes(mut self, minutes: i64) -> Self {
        self.window_minutes = minutes;
        self
    }

    /// Shared state handle for external readers.
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Process one inbound message to its terminal state.
    pub async fn handle_message(&self, msg: &InboundMessage) {
        // Only the configured source channel is processed.
        if msg.chat_id != self.source_chat_id {
            self.state.push_event(format!(
                "Ignored chat {} (expect {})",
                msg.chat_id, self.source_chat_id
            ));
            return;
        }

        // 1) Copy the original post to the destination channel. Forwarding
        //    is independent of parse outcome and its failure never blocks
        //    the rest of the pipeline.
        let forwarded = match self
            .forwarder
            .copy_message(self.source_chat_id, self.target_chat_id, msg.message_id)
            .await
        {
            Ok(()) => {
                self.state
                    .push_event(format!("Forwarded post {}", msg.message_id));
                info!(
                    message_id = msg.message_id,
                    from = self.source_chat_id,
                    to = self.target_chat_id,
                    "Forwarded message"
                );
                true
            }
            Err(e) => {
                self.state.set_error(format!("Forward failed: {e}"));
                warn!(message_id = msg.message_id, error = %e, "Forward failed");
                false
            }
        };

        // 2) Tolerant parse.
        let now = Utc::now();
        let parsed = parse_bid(&msg.text);

        self.state.record(MessageEvent {
            forwarded,
            bid_number: parsed.as_ref().map(|b| b.bid_number),
            tag: parsed.as_ref().and_then(|b| b.tag.clone()),
            at: now,
        });

        let bid = match parsed {
            Some(bid) => {
                info!(bid = bid.bid_number, tag = ?bid.tag, "Parsed bid");
                bid
            }
            None => {
                info!(message_id = msg.message_id, "Message did not match bid pattern");
                return;
            }
        };

        // 3) Upsert, when a store is configured. A failure here is logged
        //    with the store host and the pipeline moves on.
        let store = match &self.store {
            Some(store) => store,
            None => return,
        };

        let row = BidRow::from_parsed(
            &bid,
            &self.source_chat_id.to_string(),
            &self.target_chat_id.to_string(),
            now,
            self.window_minutes,
        );

        match store.upsert_bid(&row).await {
            Ok(()) => {
                self.state
                    .push_event(format!("Upserted bid {}", row.bid_number));
                info!(bid = %row.bid_number, "Upserted bid");
            }
            Err(e) => {
                self.state
                    .set_error(format!("DB upsert failed (host: {}): {e}", store.host()));
                warn!(bid = %row.bid_number, host = %store.host(), error = %e, "DB upsert failed");
                return;
            }
        }

        // 4) Best-effort notification after the committed write.
        if let Some(notifier) = &self.notifier {
            match notifier.bid_upserted(&row.bid_number).await {
                Ok(()) => {
                    self.state
                        .push_event(format!("Triggered notifications for bid {}", row.bid_number));
                    info!(bid = %row.bid_number, "Triggered notifications");
                }
                Err(e) => {
                    self.state
                        .push_event(format!("Notification failed (non-fatal): {e}"));
                    warn!(bid = %row.bid_number, error = %e, "Notification failed (non-fatal)");
                }
            }
        }
    }
}
