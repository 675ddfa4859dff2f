//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `entities.rs` - Trips, customers, agents and their cached lifetime totals
//! - `ledger.rs` - Transactions, rolling entries and expenses
//! - `membership.rs` - Trip membership and agent profit-sharing rates
//! - `aggregates.rs` - Derived aggregate rows written by the recompute pipeline

mod aggregates;
mod entities;
mod ledger;
mod membership;

use crate::domain::Decimal;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

const ROLLING_COMMISSION_RATE_KEY: &str = "rolling_commission_rate";

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Cheap round trip used by the readiness check.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Store the default rolling commission rate only if none is stored yet.
    pub async fn seed_rolling_commission_rate(&self, rate: Decimal) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO NOTHING")
            .bind(ROLLING_COMMISSION_RATE_KEY)
            .bind(rate.to_canonical_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace the default rolling commission rate. Existing entries keep the
    /// commission they were recorded with.
    pub async fn set_rolling_commission_rate(&self, rate: Decimal) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(ROLLING_COMMISSION_RATE_KEY)
        .bind(rate.to_canonical_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_rolling_commission_rate(&self) -> Result<Option<Decimal>, sqlx::Error> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(ROLLING_COMMISSION_RATE_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| decimal_column(&r, "value")))
    }
}

/// Read a decimal TEXT column, falling back to zero (with a warning) when the
/// stored text does not parse.
pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> Decimal {
    let raw: String = row.get(column);
    Decimal::from_str(&raw).unwrap_or_else(|e| {
        warn!(column = %column, value = %raw, error = %e, "Failed to parse stored decimal, using zero");
        Decimal::default()
    })
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
