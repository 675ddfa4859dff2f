use axum::extract::{Path, State};
use axum::Json;
use futures::try_join;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::{
    Agent, AgentId, AgentTripSummary, Customer, CustomerId, CustomerTripStats, Trip, TripId,
    TripSharing, TripStats,
};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatsResponse {
    pub trip: Trip,
    pub stats: TripStats,
    pub customers: Vec<CustomerTripStats>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculateResponse {
    pub trip_stats: TripStats,
    pub sharing: TripSharing,
    pub agent_summaries: Vec<AgentTripSummary>,
    pub failed_agents: Vec<AgentId>,
}

async fn load_trip(state: &AppState, trip_id: TripId) -> Result<Trip, AppError> {
    state
        .repo
        .get_trip(trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trip {trip_id}")))
}

pub async fn get_trip_stats(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
) -> Result<Json<TripStatsResponse>, AppError> {
    let trip_id = TripId::new(trip_id);
    let (trip, stats, customers) = try_join!(
        load_trip(&state, trip_id),
        async { Ok::<_, AppError>(state.repo.get_trip_stats(trip_id).await?) },
        async {
            Ok::<_, AppError>(state.repo.query_member_customer_trip_stats(trip_id).await?)
        },
    )?;

    Ok(Json(TripStatsResponse {
        trip,
        stats: stats.unwrap_or_else(|| TripStats::zeroed(trip_id)),
        customers,
    }))
}

pub async fn get_trip_sharing(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
) -> Result<Json<TripSharing>, AppError> {
    let trip_id = TripId::new(trip_id);
    load_trip(&state, trip_id).await?;
    let sharing = state
        .repo
        .get_trip_sharing(trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("sharing for trip {trip_id}")))?;
    Ok(Json(sharing))
}

pub async fn get_agent_summaries(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
) -> Result<Json<Vec<AgentTripSummary>>, AppError> {
    let trip_id = TripId::new(trip_id);
    load_trip(&state, trip_id).await?;
    Ok(Json(state.repo.query_agent_trip_summaries(trip_id).await?))
}

pub async fn recalculate_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
) -> Result<Json<RecalculateResponse>, AppError> {
    let pass = state
        .orchestrator
        .recalculate_trip(TripId::new(trip_id))
        .await?;
    Ok(Json(RecalculateResponse {
        trip_stats: pass.trip_stats,
        sharing: pass.sharing,
        agent_summaries: pass.summaries,
        failed_agents: pass.failed_agents,
    }))
}

pub async fn get_customer_totals(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<Json<Customer>, AppError> {
    let customer_id = CustomerId::new(customer_id);
    let customer = state
        .repo
        .get_customer(customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id}")))?;
    Ok(Json(customer))
}

pub async fn get_agent_totals(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
) -> Result<Json<Agent>, AppError> {
    let agent_id = AgentId::new(agent_id);
    let agent = state
        .repo
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("agent {agent_id}")))?;
    Ok(Json(agent))
}
