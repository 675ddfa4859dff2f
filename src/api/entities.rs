use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::{AppState, DecimalInput};
use crate::domain::{Agent, AgentId, Customer, Trip, TripId, TripStatus};
use crate::error::AppError;
use crate::orchestration::{BatchReport, MutationOutcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    pub name: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    pub name: String,
    pub agent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    pub name: String,
    pub commission_rate: Option<DecimalInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTripsRequest {
    pub trip_ids: Vec<i64>,
}

pub async fn create_trip(
    State(state): State<AppState>,
    Json(body): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<MutationOutcome<Trip>>), AppError> {
    let status = match body.status.as_deref() {
        None => TripStatus::Planned,
        Some(raw) => TripStatus::parse(raw)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid trip status: {raw}")))?,
    };
    let outcome = state.orchestrator.create_trip(&body.name, status).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(body): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let customer = state
        .orchestrator
        .create_customer(&body.name, body.agent_id.map(AgentId::new))
        .await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn create_agent(
    State(state): State<AppState>,
    Json(body): Json<CreateAgentRequest>,
) -> Result<(StatusCode, Json<Agent>), AppError> {
    let commission_rate = body
        .commission_rate
        .as_ref()
        .map(|r| r.parse("commissionRate"))
        .transpose()?
        .unwrap_or_default();
    let agent = state
        .orchestrator
        .create_agent(&body.name, commission_rate)
        .await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn complete_trips(
    State(state): State<AppState>,
    Json(body): Json<CompleteTripsRequest>,
) -> Result<Json<BatchReport>, AppError> {
    if body.trip_ids.is_empty() {
        return Err(AppError::BadRequest("tripIds must not be empty".to_string()));
    }
    let trip_ids: Vec<TripId> = body.trip_ids.into_iter().map(TripId::new).collect();
    Ok(Json(state.orchestrator.complete_trips(&trip_ids).await))
}

pub async fn delete_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
) -> Result<Json<BatchReport>, AppError> {
    let report = state.orchestrator.delete_trip(TripId::new(trip_id)).await?;
    Ok(Json(report))
}
