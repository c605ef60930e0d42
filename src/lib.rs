//! bidrelay: Telegram load-bid relay
//!
//! Forwards posts from a source channel into a destination chat, extracts
//! structured load-bid records from matching messages, and upserts each bid
//! exactly once by its natural key while triggering a best-effort
//! downstream notification.
//!
//! ## Architecture
//!
//! - **Parser**: tolerant grammar + field normalization for bid messages
//! - **State**: rolling ingestion counters with a synchronized snapshot
//! - **Store**: idempotent Postgres upsert keyed by bid_number
//! - **Notifier**: at-most-once webhook fan-out after a committed write
//! - **Pipeline**: per-message orchestration with stage isolation

pub mod config;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod state;
pub mod store;
pub mod telegram;

// Re-export configuration
pub use config::RelayConfig;

// Re-export commonly used types
pub use parser::{parse_bid, ParsedBid};
pub use pipeline::{Pipeline, BID_WINDOW_MINUTES};
pub use state::{MessageEvent, SharedState, StateSnapshot};
pub use store::{BidRow, BidStore, StoreError};
pub use telegram::{InboundMessage, MessageForwarder, TelegramClient, TelegramError};
