//! backfill-timestamps - fill null pickup/delivery timestamps
//!
//! One-off admin tool for rows ingested before timestamp parsing existed
//! (or whose descriptors never parsed). Generates deterministic fallback
//! values from each row's received_at: pickup lands 2-6 hours after
//! receipt, delivery 8-24 hours after pickup.
//!
//! ```bash
//! cargo run --bin backfill-timestamps -- --dry-run
//! ```

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "backfill-timestamps", about = "Fill null bid timestamps with fallback values")]
struct CliArgs {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Report what would change without writing
    #[arg(long)]
    dry_run: bool,
}

/// Deterministic but varied offsets derived from the received_at text.
fn fallback_timestamps(received_at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let mut hasher = DefaultHasher::new();
    received_at.to_rfc3339().hash(&mut hasher);
    let h = hasher.finish();

    let pickup = received_at + Duration::hours(2 + (h % 4) as i64);
    let delivery = pickup + Duration::hours(8 + (h % 16) as i64);
    (pickup, delivery)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let Some(database_url) = args.database_url else {
        bail!("DATABASE_URL must be set via --database-url or DATABASE_URL env var");
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
        "SELECT bid_number, received_at
         FROM telegram_bids
         WHERE pickup_timestamp IS NULL OR delivery_timestamp IS NULL
         ORDER BY received_at DESC",
    )
    .fetch_all(&pool)
    .await?;

    info!(count = rows.len(), "Rows with null timestamps");
    if rows.is_empty() {
        return Ok(());
    }

    if args.dry_run {
        for (bid_number, received_at) in &rows {
            let (pickup, delivery) = fallback_timestamps(*received_at);
            info!(bid = %bid_number, pickup = %pickup, delivery = %delivery, "Would update");
        }
        return Ok(());
    }

    // All updates commit together or not at all.
    let mut tx = pool.begin().await?;
    for (bid_number, received_at) in &rows {
        let (pickup, delivery) = fallback_timestamps(*received_at);
        sqlx::query(
            "UPDATE telegram_bids
             SET pickup_timestamp = $1, delivery_timestamp = $2
             WHERE bid_number = $3",
        )
        .bind(pickup)
        .bind(delivery)
        .bind(bid_number)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let remaining: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM telegram_bids
         WHERE pickup_timestamp IS NULL OR delivery_timestamp IS NULL",
    )
    .fetch_one(&pool)
    .await?;

    info!(updated = rows.len(), remaining, "Backfill complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_offsets_are_deterministic_and_in_range() {
        let received = Utc::now();
        let (p1, d1) = fallback_timestamps(received);
        let (p2, d2) = fallback_timestamps(received);
        assert_eq!((p1, d1), (p2, d2));

        let pickup_hours = (p1 - received).num_hours();
        assert!((2..=5).contains(&pickup_hours));
        let delivery_hours = (d1 - p1).num_hours();
        assert!((8..=23).contains(&delivery_hours));
    }
}
