use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{AppState, DecimalInput};
use crate::domain::Decimal;
use crate::error::AppError;
use crate::orchestration::ReconcileReport;

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rate: DecimalInput,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub rate: Decimal,
}

pub async fn get_rolling_commission_rate(
    State(state): State<AppState>,
) -> Result<Json<RateResponse>, AppError> {
    let rate = state.orchestrator.rolling_commission_rate().await?;
    Ok(Json(RateResponse { rate }))
}

/// New rolling entries pick up the rate; recorded commission is untouched.
pub async fn set_rolling_commission_rate(
    State(state): State<AppState>,
    Json(body): Json<RateRequest>,
) -> Result<Json<RateResponse>, AppError> {
    let rate = body.rate.parse("rate")?;
    let rate = state.orchestrator.set_rolling_commission_rate(rate).await?;
    Ok(Json(RateResponse { rate }))
}

pub async fn reconcile(State(state): State<AppState>) -> Result<Json<ReconcileReport>, AppError> {
    Ok(Json(state.orchestrator.reconcile().await?))
}
