//! Ingestion state
//!
//! Rolling snapshot of the pipeline: counters, last-bid fields, last error,
//! and a bounded newest-first event log. The pipeline owns the single
//! writer; external readers (a dashboard polling on its own cadence) only
//! ever see an immutable [`StateSnapshot`], never the live structure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Maximum entries retained in the event log; oldest evicted first.
pub const EVENT_LOG_CAPACITY: usize = 100;

/// One line in the bounded event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateEvent {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Per-message outcome fed to [`SharedState::record`] exactly once per
/// processed message.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Whether the original post was copied to the destination channel.
    pub forwarded: bool,
    /// Parsed bid id, when the message matched the bid grammar.
    pub bid_number: Option<u64>,
    /// Parsed tag, when present on a matched bid.
    pub tag: Option<String>,
    /// Ingestion time.
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct IngestionState {
    connected: bool,
    forwarded_count: u64,
    parsed_count: u64,
    last_bid_number: Option<u64>,
    last_tag: Option<String>,
    last_bid_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    events: VecDeque<StateEvent>,
}

/// Immutable view of the ingestion state for external readers.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub connected: bool,
    pub forwarded_count: u64,
    pub parsed_count: u64,
    pub last_bid_number: Option<u64>,
    pub last_tag: Option<String>,
    pub last_bid_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Newest first.
    pub events: Vec<StateEvent>,
}

/// Synchronized handle to the ingestion state.
///
/// All mutation goes through short critical sections; the read path clones
/// a snapshot and never blocks the pipeline on rendering.
#[derive(Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<IngestionState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed message: bump counters, overwrite last-bid
    /// fields only when a bid was parsed, and append an event line.
    pub fn record(&self, event: MessageEvent) {
        let mut s = self.lock();
        if event.forwarded {
            s.forwarded_count += 1;
        }
        if let Some(bid) = event.bid_number {
            s.parsed_count += 1;
            s.last_bid_number = Some(bid);
            s.last_tag = event.tag.clone();
            s.last_bid_at = Some(event.at);
            let tag_note = event
                .tag
                .as_deref()
                .map(|t| format!(" #{t}"))
                .unwrap_or_default();
            push(&mut s, event.at, format!("Parsed bid {bid}{tag_note}"));
        } else if event.forwarded {
            push(&mut s, event.at, "Post did not match bid pattern; forwarded only".to_string());
        }
    }

    /// Append an informational line to the event log.
    pub fn push_event(&self, message: impl Into<String>) {
        let mut s = self.lock();
        push(&mut s, Utc::now(), message.into());
    }

    /// Record a non-fatal error: remembered as `last_error` and logged as
    /// an event line.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        let mut s = self.lock();
        s.last_error = Some(message.clone());
        push(&mut s, Utc::now(), message);
    }

    /// Mark transport connectivity (polling started / stopped).
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Shallow-copy snapshot for external readers.
    pub fn snapshot(&self) -> StateSnapshot {
        let s = self.lock();
        StateSnapshot {
            connected: s.connected,
            forwarded_count: s.forwarded_count,
            parsed_count: s.parsed_count,
            last_bid_number: s.last_bid_number,
            last_tag: s.last_tag.clone(),
            last_bid_at: s.last_bid_at,
            last_error: s.last_error.clone(),
            events: s.events.iter().cloned().collect(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IngestionState> {
        // A poisoned lock only means a writer panicked mid-update; the
        // counters are still serviceable for display.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn push(state: &mut IngestionState, at: DateTime<Utc>, message: String) {
    state.events.push_front(StateEvent { at, message });
    state.events.truncate(EVENT_LOG_CAPACITY);
}
