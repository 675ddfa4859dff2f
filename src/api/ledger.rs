use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::{AppState, DecimalInput};
use crate::domain::{
    AgentId, CustomerId, Expense, ExpenseInput, NewTransaction, RollingEntry, StaffId,
    Transaction, TransactionKind, TransactionStatus, TripId,
};
use crate::error::AppError;
use crate::orchestration::{MutationOutcome, RollingInput};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub customer_id: i64,
    pub agent_id: Option<i64>,
    pub amount: DecimalInput,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingRequest {
    pub customer_id: i64,
    pub staff_id: Option<i64>,
    pub game_type: String,
    pub rolling_amount: DecimalInput,
    pub commission_rate: Option<DecimalInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRequest {
    pub expense_type: String,
    pub amount: DecimalInput,
    /// `YYYY-MM-DD`
    pub expense_date: String,
    pub description: Option<String>,
}

impl ExpenseRequest {
    fn into_input(self) -> Result<ExpenseInput, AppError> {
        let expense_date = NaiveDate::parse_from_str(self.expense_date.trim(), "%Y-%m-%d")
            .map_err(|_| {
                AppError::BadRequest(format!("Invalid expenseDate: {}", self.expense_date))
            })?;
        Ok(ExpenseInput {
            expense_type: self.expense_type,
            amount: self.amount.parse("amount")?,
            expense_date,
            description: self.description.filter(|d| !d.trim().is_empty()),
        })
    }
}

fn parse_status(raw: &str) -> Result<TransactionStatus, AppError> {
    TransactionStatus::parse(raw)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid transaction status: {raw}")))
}

pub async fn record_transaction(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
    Json(body): Json<TransactionRequest>,
) -> Result<(StatusCode, Json<MutationOutcome<Transaction>>), AppError> {
    let status = match body.status.as_deref() {
        None => TransactionStatus::Completed,
        Some(raw) => parse_status(raw)?,
    };
    let input = NewTransaction {
        trip_id: TripId::new(trip_id),
        customer_id: CustomerId::new(body.customer_id),
        agent_id: body.agent_id.map(AgentId::new),
        amount: body.amount.parse("amount")?,
        kind: TransactionKind::parse(&body.kind),
        status,
    };
    let outcome = state.orchestrator.record_transaction(input).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn set_transaction_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<MutationOutcome<Transaction>>, AppError> {
    let status = parse_status(&body.status)?;
    let outcome = state.orchestrator.set_transaction_status(id, status).await?;
    Ok(Json(outcome))
}

pub async fn record_rolling(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
    Json(body): Json<RollingRequest>,
) -> Result<(StatusCode, Json<MutationOutcome<RollingEntry>>), AppError> {
    let input = RollingInput {
        customer_id: CustomerId::new(body.customer_id),
        staff_id: body.staff_id.map(StaffId::new),
        game_type: body.game_type,
        rolling_amount: body.rolling_amount.parse("rollingAmount")?,
        commission_rate: body
            .commission_rate
            .as_ref()
            .map(|r| r.parse("commissionRate"))
            .transpose()?,
    };
    let outcome = state
        .orchestrator
        .record_rolling(TripId::new(trip_id), input)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn delete_rolling(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MutationOutcome<RollingEntry>>, AppError> {
    Ok(Json(state.orchestrator.delete_rolling(id).await?))
}

pub async fn add_expense(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
    Json(body): Json<ExpenseRequest>,
) -> Result<(StatusCode, Json<MutationOutcome<Expense>>), AppError> {
    let input = body.into_input()?;
    let outcome = state
        .orchestrator
        .add_expense(TripId::new(trip_id), input)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ExpenseRequest>,
) -> Result<Json<MutationOutcome<Expense>>, AppError> {
    let input = body.into_input()?;
    Ok(Json(state.orchestrator.update_expense(id, input).await?))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MutationOutcome<Expense>>, AppError> {
    Ok(Json(state.orchestrator.delete_expense(id).await?))
}
