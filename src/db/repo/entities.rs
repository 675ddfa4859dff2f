//! Trips, customers and agents, plus the lifetime totals cached on them.

use crate::domain::{
    Agent, AgentId, AgentTotals, Customer, CustomerId, CustomerTotals, Decimal, Trip, TripId,
    TripStatus,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

use super::{decimal_column, now_ms, Repository};

fn trip_from_row(row: &SqliteRow) -> Trip {
    let status_str: String = row.get("status");
    let status = TripStatus::parse(&status_str).unwrap_or_else(|| {
        warn!(status = %status_str, "Unknown trip status, treating as planned");
        TripStatus::Planned
    });
    Trip {
        id: TripId::new(row.get("id")),
        name: row.get("name"),
        status,
    }
}

fn customer_from_row(row: &SqliteRow) -> Customer {
    Customer {
        id: CustomerId::new(row.get("id")),
        name: row.get("name"),
        agent_id: row.get::<Option<i64>, _>("agent_id").map(AgentId::new),
        totals: CustomerTotals {
            total_rolling: decimal_column(row, "total_rolling"),
            total_win_loss: decimal_column(row, "total_win_loss"),
            total_buy_in: decimal_column(row, "total_buy_in"),
            total_buy_out: decimal_column(row, "total_buy_out"),
        },
    }
}

fn agent_from_row(row: &SqliteRow) -> Agent {
    Agent {
        id: AgentId::new(row.get("id")),
        name: row.get("name"),
        commission_rate: decimal_column(row, "commission_rate"),
        totals: AgentTotals {
            total_commission: decimal_column(row, "total_commission"),
            total_profit_share: decimal_column(row, "total_profit_share"),
            total_trips: row.get("total_trips"),
        },
    }
}

impl Repository {
    // =========================================================================
    // Trips
    // =========================================================================

    pub async fn create_trip(&self, name: &str, status: TripStatus) -> Result<Trip, sqlx::Error> {
        let result = sqlx::query("INSERT INTO trips (name, status, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(status.as_str())
            .bind(now_ms())
            .execute(&self.pool)
            .await?;

        Ok(Trip {
            id: TripId::new(result.last_insert_rowid()),
            name: name.to_string(),
            status,
        })
    }

    pub async fn get_trip(&self, trip_id: TripId) -> Result<Option<Trip>, sqlx::Error> {
        let row = sqlx::query("SELECT id, name, status FROM trips WHERE id = ?")
            .bind(trip_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(trip_from_row))
    }

    /// Returns false when the trip does not exist.
    pub async fn set_trip_status(
        &self,
        trip_id: TripId,
        status: TripStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE trips SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(trip_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes a trip; ledger facts, memberships and aggregates cascade.
    pub async fn delete_trip(&self, trip_id: TripId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM trips WHERE id = ?")
            .bind(trip_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_trip_ids(&self) -> Result<Vec<TripId>, sqlx::Error> {
        let rows = sqlx::query("SELECT id FROM trips ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| TripId::new(r.get("id"))).collect())
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub async fn create_customer(
        &self,
        name: &str,
        agent_id: Option<AgentId>,
    ) -> Result<Customer, sqlx::Error> {
        let result = sqlx::query("INSERT INTO customers (name, agent_id) VALUES (?, ?)")
            .bind(name)
            .bind(agent_id.map(|a| a.as_i64()))
            .execute(&self.pool)
            .await?;

        Ok(Customer {
            id: CustomerId::new(result.last_insert_rowid()),
            name: name.to_string(),
            agent_id,
            totals: CustomerTotals::default(),
        })
    }

    pub async fn get_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, name, agent_id, total_rolling, total_win_loss, total_buy_in, total_buy_out
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(customer_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(customer_from_row))
    }

    pub async fn get_customer_totals(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerTotals>, sqlx::Error> {
        Ok(self.get_customer(customer_id).await?.map(|c| c.totals))
    }

    pub async fn store_customer_totals(
        &self,
        customer_id: CustomerId,
        totals: &CustomerTotals,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE customers
            SET total_rolling = ?, total_win_loss = ?, total_buy_in = ?, total_buy_out = ?
            WHERE id = ?
            "#,
        )
        .bind(totals.total_rolling.to_canonical_string())
        .bind(totals.total_win_loss.to_canonical_string())
        .bind(totals.total_buy_in.to_canonical_string())
        .bind(totals.total_buy_out.to_canonical_string())
        .bind(customer_id.as_i64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_customer_ids(&self) -> Result<Vec<CustomerId>, sqlx::Error> {
        let rows = sqlx::query("SELECT id FROM customers ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| CustomerId::new(r.get("id"))).collect())
    }

    // =========================================================================
    // Agents
    // =========================================================================

    pub async fn create_agent(
        &self,
        name: &str,
        commission_rate: Decimal,
    ) -> Result<Agent, sqlx::Error> {
        let result = sqlx::query("INSERT INTO agents (name, commission_rate) VALUES (?, ?)")
            .bind(name)
            .bind(commission_rate.to_canonical_string())
            .execute(&self.pool)
            .await?;

        Ok(Agent {
            id: AgentId::new(result.last_insert_rowid()),
            name: name.to_string(),
            commission_rate,
            totals: AgentTotals::default(),
        })
    }

    pub async fn get_agent(&self, agent_id: AgentId) -> Result<Option<Agent>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, name, commission_rate, total_commission, total_profit_share, total_trips
            FROM agents
            WHERE id = ?
            "#,
        )
        .bind(agent_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(agent_from_row))
    }

    pub async fn store_agent_totals(
        &self,
        agent_id: AgentId,
        totals: &AgentTotals,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE agents
            SET total_commission = ?, total_profit_share = ?, total_trips = ?
            WHERE id = ?
            "#,
        )
        .bind(totals.total_commission.to_canonical_string())
        .bind(totals.total_profit_share.to_canonical_string())
        .bind(totals.total_trips)
        .bind(agent_id.as_i64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_agent_ids(&self) -> Result<Vec<AgentId>, sqlx::Error> {
        let rows = sqlx::query("SELECT id FROM agents ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| AgentId::new(r.get("id"))).collect())
    }
}
