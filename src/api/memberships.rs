use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::api::{AppState, DecimalInput};
use crate::domain::{Agent, AgentCustomerShare, AgentId, CustomerId, TripId};
use crate::error::AppError;
use crate::orchestration::{MutationOutcome, TripMembership};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCustomerRequest {
    pub customer_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAgentRequest {
    pub agent_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetShareRequest {
    /// Defaults to the agent's commission rate.
    pub profit_sharing_rate: Option<DecimalInput>,
}

pub async fn add_customer(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
    Json(body): Json<AddCustomerRequest>,
) -> Result<Json<MutationOutcome<TripMembership>>, AppError> {
    let outcome = state
        .orchestrator
        .add_customer_to_trip(TripId::new(trip_id), CustomerId::new(body.customer_id))
        .await?;
    Ok(Json(outcome))
}

pub async fn remove_customer(
    State(state): State<AppState>,
    Path((trip_id, customer_id)): Path<(i64, i64)>,
) -> Result<Json<MutationOutcome<TripMembership>>, AppError> {
    let outcome = state
        .orchestrator
        .remove_customer_from_trip(TripId::new(trip_id), CustomerId::new(customer_id))
        .await?;
    Ok(Json(outcome))
}

pub async fn add_agent(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
    Json(body): Json<AddAgentRequest>,
) -> Result<Json<MutationOutcome<Agent>>, AppError> {
    let outcome = state
        .orchestrator
        .add_agent_to_trip(TripId::new(trip_id), AgentId::new(body.agent_id))
        .await?;
    Ok(Json(outcome))
}

pub async fn remove_agent(
    State(state): State<AppState>,
    Path((trip_id, agent_id)): Path<(i64, i64)>,
) -> Result<Json<MutationOutcome<Agent>>, AppError> {
    let outcome = state
        .orchestrator
        .remove_agent_from_trip(TripId::new(trip_id), AgentId::new(agent_id))
        .await?;
    Ok(Json(outcome))
}

pub async fn set_share(
    State(state): State<AppState>,
    Path((trip_id, agent_id, customer_id)): Path<(i64, i64, i64)>,
    body: Option<Json<SetShareRequest>>,
) -> Result<Json<MutationOutcome<AgentCustomerShare>>, AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let rate = body
        .profit_sharing_rate
        .as_ref()
        .map(|r| r.parse("profitSharingRate"))
        .transpose()?;

    let outcome = state
        .orchestrator
        .set_agent_customer_share(
            TripId::new(trip_id),
            AgentId::new(agent_id),
            CustomerId::new(customer_id),
            rate,
        )
        .await?;
    Ok(Json(outcome))
}

pub async fn delete_share(
    State(state): State<AppState>,
    Path((trip_id, agent_id, customer_id)): Path<(i64, i64, i64)>,
) -> Result<Json<MutationOutcome<()>>, AppError> {
    let outcome = state
        .orchestrator
        .delete_agent_customer_share(
            TripId::new(trip_id),
            AgentId::new(agent_id),
            CustomerId::new(customer_id),
        )
        .await?;
    Ok(Json(outcome))
}
