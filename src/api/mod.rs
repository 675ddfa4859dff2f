pub mod admin;
pub mod entities;
pub mod health;
pub mod ledger;
pub mod memberships;
pub mod reports;

use crate::config::Config;
use crate::db::Repository;
use crate::domain::Decimal;
use crate::error::AppError;
use crate::orchestration::Orchestrator;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(
            repo.clone(),
            config.default_rolling_commission_rate,
        ));
        Self {
            repo,
            config,
            orchestrator,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        // entities
        .route("/v1/trips", post(entities::create_trip))
        .route("/v1/trips/complete", post(entities::complete_trips))
        .route("/v1/trips/:trip_id", delete(entities::delete_trip))
        .route("/v1/customers", post(entities::create_customer))
        .route("/v1/agents", post(entities::create_agent))
        // membership
        .route(
            "/v1/trips/:trip_id/customers",
            post(memberships::add_customer),
        )
        .route(
            "/v1/trips/:trip_id/customers/:customer_id",
            delete(memberships::remove_customer),
        )
        .route("/v1/trips/:trip_id/agents", post(memberships::add_agent))
        .route(
            "/v1/trips/:trip_id/agents/:agent_id",
            delete(memberships::remove_agent),
        )
        .route(
            "/v1/trips/:trip_id/agents/:agent_id/customers/:customer_id",
            put(memberships::set_share).delete(memberships::delete_share),
        )
        // ledger facts
        .route(
            "/v1/trips/:trip_id/transactions",
            post(ledger::record_transaction),
        )
        .route(
            "/v1/transactions/:id/status",
            put(ledger::set_transaction_status),
        )
        .route("/v1/trips/:trip_id/rolling", post(ledger::record_rolling))
        .route("/v1/rolling/:id", delete(ledger::delete_rolling))
        .route("/v1/trips/:trip_id/expenses", post(ledger::add_expense))
        .route(
            "/v1/expenses/:id",
            put(ledger::update_expense).delete(ledger::delete_expense),
        )
        // reads
        .route("/v1/trips/:trip_id/stats", get(reports::get_trip_stats))
        .route("/v1/trips/:trip_id/sharing", get(reports::get_trip_sharing))
        .route(
            "/v1/trips/:trip_id/agent-summaries",
            get(reports::get_agent_summaries),
        )
        .route(
            "/v1/trips/:trip_id/recalculate",
            post(reports::recalculate_trip),
        )
        .route(
            "/v1/customers/:customer_id/totals",
            get(reports::get_customer_totals),
        )
        .route("/v1/agents/:agent_id/totals", get(reports::get_agent_totals))
        // admin
        .route(
            "/v1/settings/rolling-commission-rate",
            get(admin::get_rolling_commission_rate).put(admin::set_rolling_commission_rate),
        )
        .route("/v1/reconcile", post(admin::reconcile))
        .layer(cors)
        .with_state(state)
}

/// A decimal sent either as a JSON string (`"1000.50"`) or a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalInput {
    pub fn parse(&self, field: &str) -> Result<Decimal, AppError> {
        let raw = match self {
            DecimalInput::Text(s) => s.clone(),
            DecimalInput::Number(n) => n.to_string(),
        };
        Decimal::from_str(&raw)
            .map_err(|_| AppError::BadRequest(format!("Invalid {field}: {raw}")))
    }
}
