//! Trip-wide expenses.

use crate::domain::{Decimal, TripId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    pub trip_id: TripId,
    pub expense_type: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Fields of an expense that can be written or rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseInput {
    pub expense_type: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
}
