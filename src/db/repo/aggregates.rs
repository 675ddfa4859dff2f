//! Derived aggregate rows written by the recompute pipeline.
//!
//! Each stage writes its output in a single transaction so readers never see
//! a sharing row without its breakdown, or half of a trip's agent summaries.

use crate::domain::{
    AgentId, AgentShareBreakdown, AgentTripSummary, CustomerId, CustomerTripStats, TripId,
    TripSharing, TripStats,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{decimal_column, now_ms, Repository};

const CUSTOMER_STATS_COLUMNS: &str = "cts.trip_id, cts.customer_id, cts.total_buy_in, \
     cts.total_cash_out, cts.total_win_loss, cts.rolling_amount, cts.total_commission_earned, \
     cts.net_result";
const SUMMARY_COLUMNS: &str = "s.trip_id, s.agent_id, s.customer_count, s.total_win_loss, \
     s.total_commission, s.total_profit, s.agent_profit_share";

fn customer_stats_from_row(row: &SqliteRow) -> CustomerTripStats {
    CustomerTripStats {
        trip_id: TripId::new(row.get("trip_id")),
        customer_id: CustomerId::new(row.get("customer_id")),
        total_buy_in: decimal_column(row, "total_buy_in"),
        total_cash_out: decimal_column(row, "total_cash_out"),
        total_win_loss: decimal_column(row, "total_win_loss"),
        rolling_amount: decimal_column(row, "rolling_amount"),
        total_commission_earned: decimal_column(row, "total_commission_earned"),
        net_result: decimal_column(row, "net_result"),
    }
}

fn summary_from_row(row: &SqliteRow) -> AgentTripSummary {
    AgentTripSummary {
        trip_id: TripId::new(row.get("trip_id")),
        agent_id: AgentId::new(row.get("agent_id")),
        customer_count: row.get("customer_count"),
        total_win_loss: decimal_column(row, "total_win_loss"),
        total_commission: decimal_column(row, "total_commission"),
        total_profit: decimal_column(row, "total_profit"),
        agent_profit_share: decimal_column(row, "agent_profit_share"),
    }
}

impl Repository {
    // =========================================================================
    // Customer trip stats
    // =========================================================================

    pub async fn upsert_customer_trip_stats(
        &self,
        stats: &CustomerTripStats,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO customer_trip_stats (
                trip_id, customer_id, total_buy_in, total_cash_out, total_win_loss,
                rolling_amount, total_commission_earned, net_result, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(trip_id, customer_id) DO UPDATE SET
                total_buy_in = excluded.total_buy_in,
                total_cash_out = excluded.total_cash_out,
                total_win_loss = excluded.total_win_loss,
                rolling_amount = excluded.rolling_amount,
                total_commission_earned = excluded.total_commission_earned,
                net_result = excluded.net_result,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(stats.trip_id.as_i64())
        .bind(stats.customer_id.as_i64())
        .bind(stats.total_buy_in.to_canonical_string())
        .bind(stats.total_cash_out.to_canonical_string())
        .bind(stats.total_win_loss.to_canonical_string())
        .bind(stats.rolling_amount.to_canonical_string())
        .bind(stats.total_commission_earned.to_canonical_string())
        .bind(stats.net_result.to_canonical_string())
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_customer_trip_stats(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerTripStats>, sqlx::Error> {
        let sql = format!(
            "SELECT {CUSTOMER_STATS_COLUMNS} FROM customer_trip_stats cts \
             WHERE cts.trip_id = ? AND cts.customer_id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(trip_id.as_i64())
            .bind(customer_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(customer_stats_from_row))
    }

    pub async fn delete_customer_trip_stats(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM customer_trip_stats WHERE trip_id = ? AND customer_id = ?")
                .bind(trip_id.as_i64())
                .bind(customer_id.as_i64())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stats rows of a trip's current members, ordered by customer.
    pub async fn query_member_customer_trip_stats(
        &self,
        trip_id: TripId,
    ) -> Result<Vec<CustomerTripStats>, sqlx::Error> {
        let sql = format!(
            "SELECT {CUSTOMER_STATS_COLUMNS} FROM customer_trip_stats cts \
             JOIN trip_customers tc ON tc.trip_id = cts.trip_id AND tc.customer_id = cts.customer_id \
             WHERE cts.trip_id = ? ORDER BY cts.customer_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(trip_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(customer_stats_from_row).collect())
    }

    /// Stats rows across every trip the customer currently belongs to.
    pub async fn query_customer_trip_stats_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerTripStats>, sqlx::Error> {
        let sql = format!(
            "SELECT {CUSTOMER_STATS_COLUMNS} FROM customer_trip_stats cts \
             JOIN trip_customers tc ON tc.trip_id = cts.trip_id AND tc.customer_id = cts.customer_id \
             WHERE cts.customer_id = ? ORDER BY cts.trip_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(customer_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(customer_stats_from_row).collect())
    }

    // =========================================================================
    // Trip stats
    // =========================================================================

    pub async fn upsert_trip_stats(&self, stats: &TripStats) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO trip_stats (
                trip_id, customer_count, total_buy_in, total_cash_out, total_win_loss,
                net_profit, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(trip_id) DO UPDATE SET
                customer_count = excluded.customer_count,
                total_buy_in = excluded.total_buy_in,
                total_cash_out = excluded.total_cash_out,
                total_win_loss = excluded.total_win_loss,
                net_profit = excluded.net_profit,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(stats.trip_id.as_i64())
        .bind(stats.customer_count)
        .bind(stats.total_buy_in.to_canonical_string())
        .bind(stats.total_cash_out.to_canonical_string())
        .bind(stats.total_win_loss.to_canonical_string())
        .bind(stats.net_profit.to_canonical_string())
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_trip_stats(&self, trip_id: TripId) -> Result<Option<TripStats>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT trip_id, customer_count, total_buy_in, total_cash_out, total_win_loss, net_profit
            FROM trip_stats
            WHERE trip_id = ?
            "#,
        )
        .bind(trip_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| TripStats {
            trip_id: TripId::new(row.get("trip_id")),
            customer_count: row.get("customer_count"),
            total_buy_in: decimal_column(&row, "total_buy_in"),
            total_cash_out: decimal_column(&row, "total_cash_out"),
            total_win_loss: decimal_column(&row, "total_win_loss"),
            net_profit: decimal_column(&row, "net_profit"),
        }))
    }

    // =========================================================================
    // Trip sharing
    // =========================================================================

    /// Replaces the sharing row and its per-agent breakdown atomically.
    pub async fn store_trip_sharing(&self, sharing: &TripSharing) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let trip_id = sharing.trip_id.as_i64();

        sqlx::query(
            r#"
            INSERT INTO trip_sharing (
                trip_id, total_win_loss, total_expenses, total_rolling_commission,
                net_cash_flow, net_result, total_agent_share, company_share,
                agent_share_percentage, company_share_percentage, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(trip_id) DO UPDATE SET
                total_win_loss = excluded.total_win_loss,
                total_expenses = excluded.total_expenses,
                total_rolling_commission = excluded.total_rolling_commission,
                net_cash_flow = excluded.net_cash_flow,
                net_result = excluded.net_result,
                total_agent_share = excluded.total_agent_share,
                company_share = excluded.company_share,
                agent_share_percentage = excluded.agent_share_percentage,
                company_share_percentage = excluded.company_share_percentage,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(trip_id)
        .bind(sharing.total_win_loss.to_canonical_string())
        .bind(sharing.total_expenses.to_canonical_string())
        .bind(sharing.total_rolling_commission.to_canonical_string())
        .bind(sharing.net_cash_flow.to_canonical_string())
        .bind(sharing.net_result.to_canonical_string())
        .bind(sharing.total_agent_share.to_canonical_string())
        .bind(sharing.company_share.to_canonical_string())
        .bind(sharing.agent_share_percentage.to_canonical_string())
        .bind(sharing.company_share_percentage.to_canonical_string())
        .bind(now_ms())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM trip_sharing_agents WHERE trip_id = ?")
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;

        for line in &sharing.agent_breakdown {
            sqlx::query(
                r#"
                INSERT INTO trip_sharing_agents (trip_id, agent_id, profit_sharing_rate, share_amount)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(trip_id)
            .bind(line.agent_id.as_i64())
            .bind(line.profit_sharing_rate.to_canonical_string())
            .bind(line.share_amount.to_canonical_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_trip_sharing(
        &self,
        trip_id: TripId,
    ) -> Result<Option<TripSharing>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT trip_id, total_win_loss, total_expenses, total_rolling_commission,
                   net_cash_flow, net_result, total_agent_share, company_share,
                   agent_share_percentage, company_share_percentage
            FROM trip_sharing
            WHERE trip_id = ?
            "#,
        )
        .bind(trip_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let breakdown_rows = sqlx::query(
            r#"
            SELECT agent_id, profit_sharing_rate, share_amount
            FROM trip_sharing_agents
            WHERE trip_id = ?
            ORDER BY agent_id ASC
            "#,
        )
        .bind(trip_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let agent_breakdown = breakdown_rows
            .iter()
            .map(|r| AgentShareBreakdown {
                agent_id: AgentId::new(r.get("agent_id")),
                profit_sharing_rate: decimal_column(r, "profit_sharing_rate"),
                share_amount: decimal_column(r, "share_amount"),
            })
            .collect();

        Ok(Some(TripSharing {
            trip_id: TripId::new(row.get("trip_id")),
            total_win_loss: decimal_column(&row, "total_win_loss"),
            total_expenses: decimal_column(&row, "total_expenses"),
            total_rolling_commission: decimal_column(&row, "total_rolling_commission"),
            net_cash_flow: decimal_column(&row, "net_cash_flow"),
            net_result: decimal_column(&row, "net_result"),
            total_agent_share: decimal_column(&row, "total_agent_share"),
            company_share: decimal_column(&row, "company_share"),
            agent_share_percentage: decimal_column(&row, "agent_share_percentage"),
            company_share_percentage: decimal_column(&row, "company_share_percentage"),
            agent_breakdown,
        }))
    }

    // =========================================================================
    // Agent trip summaries
    // =========================================================================

    /// Upserts every summary for one trip inside a single transaction.
    pub async fn store_agent_trip_summaries(
        &self,
        summaries: &[AgentTripSummary],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let updated_at = now_ms();

        for summary in summaries {
            sqlx::query(
                r#"
                INSERT INTO agent_trip_summaries (
                    trip_id, agent_id, customer_count, total_win_loss, total_commission,
                    total_profit, agent_profit_share, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(trip_id, agent_id) DO UPDATE SET
                    customer_count = excluded.customer_count,
                    total_win_loss = excluded.total_win_loss,
                    total_commission = excluded.total_commission,
                    total_profit = excluded.total_profit,
                    agent_profit_share = excluded.agent_profit_share,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(summary.trip_id.as_i64())
            .bind(summary.agent_id.as_i64())
            .bind(summary.customer_count)
            .bind(summary.total_win_loss.to_canonical_string())
            .bind(summary.total_commission.to_canonical_string())
            .bind(summary.total_profit.to_canonical_string())
            .bind(summary.agent_profit_share.to_canonical_string())
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn query_agent_trip_summaries(
        &self,
        trip_id: TripId,
    ) -> Result<Vec<AgentTripSummary>, sqlx::Error> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM agent_trip_summaries s \
             WHERE s.trip_id = ? ORDER BY s.agent_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(trip_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(summary_from_row).collect())
    }

    /// The agent's summaries restricted to trips it is currently a member of.
    pub async fn query_agent_summaries_in_member_trips(
        &self,
        agent_id: AgentId,
    ) -> Result<Vec<AgentTripSummary>, sqlx::Error> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM agent_trip_summaries s \
             JOIN trip_agents ta ON ta.trip_id = s.trip_id AND ta.agent_id = s.agent_id \
             WHERE s.agent_id = ? ORDER BY s.trip_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(agent_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(summary_from_row).collect())
    }
}
