//! Trip membership and per-trip agent profit-sharing rates.

use crate::domain::{AgentCustomerShare, AgentId, CustomerAgentAssignment, CustomerId, TripId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::BTreeSet;

use super::{decimal_column, now_ms, Repository};

fn share_from_row(row: &SqliteRow) -> AgentCustomerShare {
    AgentCustomerShare {
        trip_id: TripId::new(row.get("trip_id")),
        agent_id: AgentId::new(row.get("agent_id")),
        customer_id: CustomerId::new(row.get("customer_id")),
        profit_sharing_rate: decimal_column(row, "profit_sharing_rate"),
    }
}

impl Repository {
    // =========================================================================
    // Trip customers
    // =========================================================================

    /// Returns false when the customer was already a member.
    pub async fn add_trip_customer(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO trip_customers (trip_id, customer_id, joined_at) VALUES (?, ?, ?)",
        )
        .bind(trip_id.as_i64())
        .bind(customer_id.as_i64())
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drops the membership together with every share row that referenced
    /// the customer on this trip.
    pub async fn remove_trip_customer(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM trip_agent_customers WHERE trip_id = ? AND customer_id = ?")
            .bind(trip_id.as_i64())
            .bind(customer_id.as_i64())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM trip_customers WHERE trip_id = ? AND customer_id = ?")
            .bind(trip_id.as_i64())
            .bind(customer_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_trip_customer(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM trip_customers WHERE trip_id = ? AND customer_id = ?")
            .bind(trip_id.as_i64())
            .bind(customer_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn query_trip_customer_ids(
        &self,
        trip_id: TripId,
    ) -> Result<BTreeSet<CustomerId>, sqlx::Error> {
        let rows = sqlx::query("SELECT customer_id FROM trip_customers WHERE trip_id = ?")
            .bind(trip_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| CustomerId::new(r.get("customer_id")))
            .collect())
    }

    pub async fn query_trips_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<TripId>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT trip_id FROM trip_customers WHERE customer_id = ? ORDER BY trip_id ASC",
        )
        .bind(customer_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| TripId::new(r.get("trip_id"))).collect())
    }

    // =========================================================================
    // Trip agents
    // =========================================================================

    pub async fn add_trip_agent(
        &self,
        trip_id: TripId,
        agent_id: AgentId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("INSERT OR IGNORE INTO trip_agents (trip_id, agent_id) VALUES (?, ?)")
            .bind(trip_id.as_i64())
            .bind(agent_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drops the agent from the trip with its share rows and its summary row.
    /// Returns false when the agent was not a member.
    pub async fn remove_trip_agent(
        &self,
        trip_id: TripId,
        agent_id: AgentId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for table in ["trip_agent_customers", "agent_trip_summaries"] {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE trip_id = ? AND agent_id = ?"
            ))
            .bind(trip_id.as_i64())
            .bind(agent_id.as_i64())
            .execute(&mut *tx)
            .await?;
        }

        let result = sqlx::query("DELETE FROM trip_agents WHERE trip_id = ? AND agent_id = ?")
            .bind(trip_id.as_i64())
            .bind(agent_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn query_trip_agent_ids(
        &self,
        trip_id: TripId,
    ) -> Result<BTreeSet<AgentId>, sqlx::Error> {
        let rows = sqlx::query("SELECT agent_id FROM trip_agents WHERE trip_id = ?")
            .bind(trip_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| AgentId::new(r.get("agent_id"))).collect())
    }

    pub async fn query_trips_for_agent(&self, agent_id: AgentId) -> Result<Vec<TripId>, sqlx::Error> {
        let rows =
            sqlx::query("SELECT trip_id FROM trip_agents WHERE agent_id = ? ORDER BY trip_id ASC")
                .bind(agent_id.as_i64())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(|r| TripId::new(r.get("trip_id"))).collect())
    }

    // =========================================================================
    // Agent-customer shares
    // =========================================================================

    /// Insert or replace a share rate. The agent becomes a trip member if it
    /// was not one already.
    pub async fn upsert_agent_customer_share(
        &self,
        share: &AgentCustomerShare,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO trip_agents (trip_id, agent_id) VALUES (?, ?)")
            .bind(share.trip_id.as_i64())
            .bind(share.agent_id.as_i64())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO trip_agent_customers (trip_id, agent_id, customer_id, profit_sharing_rate)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(trip_id, agent_id, customer_id)
            DO UPDATE SET profit_sharing_rate = excluded.profit_sharing_rate
            "#,
        )
        .bind(share.trip_id.as_i64())
        .bind(share.agent_id.as_i64())
        .bind(share.customer_id.as_i64())
        .bind(share.profit_sharing_rate.to_canonical_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_agent_customer_share(
        &self,
        trip_id: TripId,
        agent_id: AgentId,
        customer_id: CustomerId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM trip_agent_customers WHERE trip_id = ? AND agent_id = ? AND customer_id = ?",
        )
        .bind(trip_id.as_i64())
        .bind(agent_id.as_i64())
        .bind(customer_id.as_i64())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Explicit share rows for a trip, optionally filtered by agent and/or
    /// customer. Ordered by (agent, customer).
    pub async fn query_agent_customer_shares(
        &self,
        trip_id: TripId,
        agent_id: Option<AgentId>,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<AgentCustomerShare>, sqlx::Error> {
        let mut sql = String::from(
            "SELECT trip_id, agent_id, customer_id, profit_sharing_rate \
             FROM trip_agent_customers WHERE trip_id = ?",
        );
        if agent_id.is_some() {
            sql.push_str(" AND agent_id = ?");
        }
        if customer_id.is_some() {
            sql.push_str(" AND customer_id = ?");
        }
        sql.push_str(" ORDER BY agent_id ASC, customer_id ASC");

        let mut query = sqlx::query(&sql).bind(trip_id.as_i64());
        if let Some(agent_id) = agent_id {
            query = query.bind(agent_id.as_i64());
        }
        if let Some(customer_id) = customer_id {
            query = query.bind(customer_id.as_i64());
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(share_from_row).collect())
    }

    /// Member customers whose globally assigned agent is also a member of the
    /// trip, with that agent's default rate.
    pub async fn query_customer_agent_assignments(
        &self,
        trip_id: TripId,
    ) -> Result<Vec<CustomerAgentAssignment>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT c.id AS customer_id, a.id AS agent_id, a.commission_rate AS commission_rate
            FROM trip_customers tc
            JOIN customers c ON c.id = tc.customer_id
            JOIN agents a ON a.id = c.agent_id
            JOIN trip_agents ta ON ta.trip_id = tc.trip_id AND ta.agent_id = a.id
            WHERE tc.trip_id = ?
            ORDER BY a.id ASC, c.id ASC
            "#,
        )
        .bind(trip_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CustomerAgentAssignment {
                customer_id: CustomerId::new(row.get("customer_id")),
                agent_id: AgentId::new(row.get("agent_id")),
                commission_rate: decimal_column(row, "commission_rate"),
            })
            .collect())
    }
}
