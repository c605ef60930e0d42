//! Pipeline Regression Tests
//!
//! Exercises the per-message orchestrator end to end with a mock transport:
//! forwarding, tolerant parsing, ingestion-state updates, and stage
//! isolation (a forward failure must not block parsing, a parse miss must
//! still count the forward). Persistence and notification stages stay
//! disabled here; their contracts are covered by unit tests.

use async_trait::async_trait;
use bidrelay::telegram::TelegramError;
use bidrelay::{InboundMessage, MessageForwarder, Pipeline, SharedState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const SOURCE_CHAT: i64 = -1001;
const TARGET_CHAT: i64 = -1002;

const SAMPLE_BID: &str = "\
New Load Bid: 87642971
Distance: 426.0 miles
Pickup: 10/13/2025 04:00 AM
Delivery: 10/13/2025 04:14 PM
Stops:
  Stop 1: WARRENDALE, PA
  Stop 2: WHITE PLAINS, NY
  Stop 3: STAMFORD, CT
#PA";

/// Transport double: counts copies, optionally fails every call.
#[derive(Default)]
struct MockForwarder {
    copies: AtomicU64,
    fail: bool,
}

#[async_trait]
impl MessageForwarder for MockForwarder {
    async fn copy_message(
        &self,
        _from_chat_id: i64,
        _to_chat_id: i64,
        _message_id: i64,
    ) -> Result<(), TelegramError> {
        if self.fail {
            return Err(TelegramError::Api("chat not found".to_string()));
        }
        self.copies.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn build_pipeline(forwarder: Arc<MockForwarder>) -> Pipeline<MockForwarder> {
    Pipeline::new(
        forwarder,
        None,
        None,
        SharedState::new(),
        SOURCE_CHAT,
        TARGET_CHAT,
    )
}

fn message(text: &str) -> InboundMessage {
    InboundMessage {
        chat_id: SOURCE_CHAT,
        message_id: 1,
        text: text.to_string(),
    }
}

#[tokio::test]
async fn bid_message_is_forwarded_and_parsed() {
    let forwarder = Arc::new(MockForwarder::default());
    let pipeline = build_pipeline(Arc::clone(&forwarder));

    pipeline.handle_message(&message(SAMPLE_BID)).await;

    assert_eq!(forwarder.copies.load(Ordering::Relaxed), 1);
    let snap = pipeline.state().snapshot();
    assert_eq!(snap.forwarded_count, 1);
    assert_eq!(snap.parsed_count, 1);
    assert_eq!(snap.last_bid_number, Some(87642971));
    assert_eq!(snap.last_tag.as_deref(), Some("PA"));
    assert!(snap.last_bid_at.is_some());
}

#[tokio::test]
async fn non_bid_message_is_forwarded_only() {
    let forwarder = Arc::new(MockForwarder::default());
    let pipeline = build_pipeline(Arc::clone(&forwarder));

    pipeline
        .handle_message(&message("Weekly rate update, no loads today"))
        .await;

    assert_eq!(forwarder.copies.load(Ordering::Relaxed), 1);
    let snap = pipeline.state().snapshot();
    assert_eq!(snap.forwarded_count, 1);
    assert_eq!(snap.parsed_count, 0);
    assert!(snap.last_bid_number.is_none());
}

#[tokio::test]
async fn forward_failure_does_not_block_parsing() {
    let forwarder = Arc::new(MockForwarder {
        fail: true,
        ..Default::default()
    });
    let pipeline = build_pipeline(Arc::clone(&forwarder));

    pipeline.handle_message(&message(SAMPLE_BID)).await;

    let snap = pipeline.state().snapshot();
    assert_eq!(snap.forwarded_count, 0);
    assert_eq!(snap.parsed_count, 1);
    assert_eq!(snap.last_bid_number, Some(87642971));
    assert!(snap
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("Forward failed")));
}

#[tokio::test]
async fn messages_from_other_chats_are_ignored() {
    let forwarder = Arc::new(MockForwarder::default());
    let pipeline = build_pipeline(Arc::clone(&forwarder));

    pipeline
        .handle_message(&InboundMessage {
            chat_id: -4242,
            message_id: 9,
            text: SAMPLE_BID.to_string(),
        })
        .await;

    assert_eq!(forwarder.copies.load(Ordering::Relaxed), 0);
    let snap = pipeline.state().snapshot();
    assert_eq!(snap.forwarded_count, 0);
    assert_eq!(snap.parsed_count, 0);
    // The ignored chat still leaves an informational event behind.
    assert!(snap
        .events
        .first()
        .is_some_and(|e| e.message.contains("Ignored chat")));
}

#[tokio::test]
async fn repeated_bid_overwrites_last_bid_fields() {
    let forwarder = Arc::new(MockForwarder::default());
    let pipeline = build_pipeline(Arc::clone(&forwarder));

    pipeline.handle_message(&message(SAMPLE_BID)).await;
    pipeline
        .handle_message(&message("New Load Bid: 99\nDistance: 10 miles\n#nc"))
        .await;

    let snap = pipeline.state().snapshot();
    assert_eq!(snap.parsed_count, 2);
    assert_eq!(snap.last_bid_number, Some(99));
    assert_eq!(snap.last_tag.as_deref(), Some("NC"));
}
