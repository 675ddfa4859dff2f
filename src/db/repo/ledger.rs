//! Ledger facts: transactions, rolling entries and expenses.

use crate::domain::{
    AgentId, CustomerId, Expense, ExpenseInput, NewRollingEntry, NewTransaction, RollingEntry,
    StaffId, TimeMs, Transaction, TransactionKind, TransactionStatus, TripId,
};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

use super::{decimal_column, now_ms, Repository};

const TRANSACTION_COLUMNS: &str =
    "id, trip_id, customer_id, agent_id, amount, kind, status, created_at";
const ROLLING_COLUMNS: &str = "id, trip_id, customer_id, staff_id, game_type, rolling_amount, \
     commission_rate, commission_earned, recorded_at";
const EXPENSE_COLUMNS: &str = "id, trip_id, expense_type, amount, expense_date, description";

fn transaction_from_row(row: &SqliteRow) -> Transaction {
    let id: i64 = row.get("id");
    let status_str: String = row.get("status");
    let status = TransactionStatus::parse(&status_str).unwrap_or_else(|| {
        warn!(transaction_id = id, status = %status_str, "Unknown transaction status, treating as pending");
        TransactionStatus::Pending
    });
    Transaction {
        id,
        trip_id: TripId::new(row.get("trip_id")),
        customer_id: CustomerId::new(row.get("customer_id")),
        agent_id: row.get::<Option<i64>, _>("agent_id").map(AgentId::new),
        amount: decimal_column(row, "amount"),
        kind: TransactionKind::parse(&row.get::<String, _>("kind")),
        status,
        created_at: TimeMs::new(row.get("created_at")),
    }
}

fn rolling_from_row(row: &SqliteRow) -> RollingEntry {
    RollingEntry {
        id: row.get("id"),
        trip_id: TripId::new(row.get("trip_id")),
        customer_id: CustomerId::new(row.get("customer_id")),
        staff_id: row.get::<Option<i64>, _>("staff_id").map(StaffId::new),
        game_type: row.get("game_type"),
        rolling_amount: decimal_column(row, "rolling_amount"),
        commission_rate: decimal_column(row, "commission_rate"),
        commission_earned: decimal_column(row, "commission_earned"),
        recorded_at: TimeMs::new(row.get("recorded_at")),
    }
}

fn expense_from_row(row: &SqliteRow) -> Expense {
    let id: i64 = row.get("id");
    let date_str: String = row.get("expense_date");
    let expense_date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_else(|e| {
        warn!(expense_id = id, expense_date = %date_str, error = %e, "Failed to parse expense date, using epoch");
        NaiveDate::default()
    });
    Expense {
        id,
        trip_id: TripId::new(row.get("trip_id")),
        expense_type: row.get("expense_type"),
        amount: decimal_column(row, "amount"),
        expense_date,
        description: row.get("description"),
    }
}

impl Repository {
    // =========================================================================
    // Transactions
    // =========================================================================

    pub async fn insert_transaction(&self, tx: &NewTransaction) -> Result<Transaction, sqlx::Error> {
        let created_at = now_ms();
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (trip_id, customer_id, agent_id, amount, kind, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tx.trip_id.as_i64())
        .bind(tx.customer_id.as_i64())
        .bind(tx.agent_id.map(|a| a.as_i64()))
        .bind(tx.amount.to_canonical_string())
        .bind(tx.kind.as_str())
        .bind(tx.status.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Transaction {
            id: result.last_insert_rowid(),
            trip_id: tx.trip_id,
            customer_id: tx.customer_id,
            agent_id: tx.agent_id,
            amount: tx.amount,
            kind: tx.kind.clone(),
            status: tx.status,
            created_at: TimeMs::new(created_at),
        })
    }

    pub async fn get_transaction(&self, id: i64) -> Result<Option<Transaction>, sqlx::Error> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(transaction_from_row))
    }

    pub async fn update_transaction_status(
        &self,
        id: i64,
        status: TransactionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE transactions SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Completed transactions for one customer in one trip, oldest first.
    pub async fn query_completed_transactions(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE trip_id = ? AND customer_id = ? AND status = ? \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(trip_id.as_i64())
            .bind(customer_id.as_i64())
            .bind(TransactionStatus::Completed.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(transaction_from_row).collect())
    }

    /// Insert a raw transaction row. Used to load facts whose kind the
    /// service itself never writes.
    pub async fn insert_raw_transaction(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
        amount: &str,
        kind: &str,
        status: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (trip_id, customer_id, agent_id, amount, kind, status, created_at)
            VALUES (?, ?, NULL, ?, ?, ?, ?)
            "#,
        )
        .bind(trip_id.as_i64())
        .bind(customer_id.as_i64())
        .bind(amount)
        .bind(kind)
        .bind(status)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    // =========================================================================
    // Rolling entries
    // =========================================================================

    /// Stores the entry with its commission computed at the entry's own rate.
    pub async fn insert_rolling_entry(
        &self,
        entry: &NewRollingEntry,
    ) -> Result<RollingEntry, sqlx::Error> {
        let recorded_at = now_ms();
        let commission_earned = entry.commission_earned();
        let result = sqlx::query(
            r#"
            INSERT INTO rolling_entries (
                trip_id, customer_id, staff_id, game_type, rolling_amount,
                commission_rate, commission_earned, recorded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.trip_id.as_i64())
        .bind(entry.customer_id.as_i64())
        .bind(entry.staff_id.map(|s| s.as_i64()))
        .bind(&entry.game_type)
        .bind(entry.rolling_amount.to_canonical_string())
        .bind(entry.commission_rate.to_canonical_string())
        .bind(commission_earned.to_canonical_string())
        .bind(recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(RollingEntry {
            id: result.last_insert_rowid(),
            trip_id: entry.trip_id,
            customer_id: entry.customer_id,
            staff_id: entry.staff_id,
            game_type: entry.game_type.clone(),
            rolling_amount: entry.rolling_amount,
            commission_rate: entry.commission_rate,
            commission_earned,
            recorded_at: TimeMs::new(recorded_at),
        })
    }

    pub async fn get_rolling_entry(&self, id: i64) -> Result<Option<RollingEntry>, sqlx::Error> {
        let sql = format!("SELECT {ROLLING_COLUMNS} FROM rolling_entries WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(rolling_from_row))
    }

    pub async fn delete_rolling_entry(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rolling_entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rolling entries for a trip, optionally narrowed to one customer.
    pub async fn query_rolling_entries(
        &self,
        trip_id: TripId,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<RollingEntry>, sqlx::Error> {
        let rows = match customer_id {
            Some(customer_id) => {
                let sql = format!(
                    "SELECT {ROLLING_COLUMNS} FROM rolling_entries \
                     WHERE trip_id = ? AND customer_id = ? ORDER BY recorded_at ASC, id ASC"
                );
                sqlx::query(&sql)
                    .bind(trip_id.as_i64())
                    .bind(customer_id.as_i64())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {ROLLING_COLUMNS} FROM rolling_entries \
                     WHERE trip_id = ? ORDER BY recorded_at ASC, id ASC"
                );
                sqlx::query(&sql)
                    .bind(trip_id.as_i64())
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.iter().map(rolling_from_row).collect())
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    pub async fn insert_expense(
        &self,
        trip_id: TripId,
        input: &ExpenseInput,
    ) -> Result<Expense, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO expenses (trip_id, expense_type, amount, expense_date, description)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(trip_id.as_i64())
        .bind(&input.expense_type)
        .bind(input.amount.to_canonical_string())
        .bind(input.expense_date.format("%Y-%m-%d").to_string())
        .bind(input.description.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(Expense {
            id: result.last_insert_rowid(),
            trip_id,
            expense_type: input.expense_type.clone(),
            amount: input.amount,
            expense_date: input.expense_date,
            description: input.description.clone(),
        })
    }

    pub async fn get_expense(&self, id: i64) -> Result<Option<Expense>, sqlx::Error> {
        let sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(expense_from_row))
    }

    pub async fn update_expense(&self, id: i64, input: &ExpenseInput) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET expense_type = ?, amount = ?, expense_date = ?, description = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.expense_type)
        .bind(input.amount.to_canonical_string())
        .bind(input.expense_date.format("%Y-%m-%d").to_string())
        .bind(input.description.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_expense(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn query_expenses(&self, trip_id: TripId) -> Result<Vec<Expense>, sqlx::Error> {
        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE trip_id = ? \
             ORDER BY expense_date ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(trip_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(expense_from_row).collect())
    }
}
