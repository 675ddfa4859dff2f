//! Recompute pipeline for keeping derived aggregates in line with the ledger.
//!
//! This module provides:
//! - Typed stage outputs, each consumed by the next stage in order
//! - The `Recomputer`, which reads ledger facts, runs the pure engine and
//!   persists each stage in its own transaction
//! - The shared `PipelineError` type

use crate::domain::{
    AgentCustomerShare, AgentId, AgentTotals, AgentTripSummary, CustomerId, CustomerTotals,
    CustomerTripStats, Decimal, TripId, TripSharing, TripStats,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub mod pipeline;

pub use pipeline::Recomputer;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("customer {customer_id} is not a member of trip {trip_id}")]
    NotTripMember {
        trip_id: TripId,
        customer_id: CustomerId,
    },
}

/// Pipeline stages in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CustomerStats,
    TripTotals,
    Sharing,
    AgentSummary,
    AgentRollup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CustomerStats => "customer_stats",
            Stage::TripTotals => "trip_totals",
            Stage::Sharing => "sharing",
            Stage::AgentSummary => "agent_summary",
            Stage::AgentRollup => "agent_rollup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline error tagged with the stage that raised it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

impl StageFailure {
    pub fn new(stage: Stage, source: PipelineError) -> Self {
        Self { stage, source }
    }
}

/// Output of the customer stage: refreshed stats rows and the customers'
/// rebuilt lifetime totals.
#[derive(Debug, Clone)]
pub struct CustomerStatsStage {
    pub trip_id: TripId,
    pub refreshed: Vec<CustomerTripStats>,
    pub customer_totals: Vec<(CustomerId, CustomerTotals)>,
}

impl CustomerStatsStage {
    /// Entry point for trip-level passes that did not touch any customer row.
    pub fn unchanged(trip_id: TripId) -> Self {
        Self {
            trip_id,
            refreshed: Vec::new(),
            customer_totals: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TripTotalsStage {
    pub trip_stats: TripStats,
    /// Member rows the totals were summed from.
    pub customer_stats: Vec<CustomerTripStats>,
}

#[derive(Debug, Clone)]
pub struct SharingStage {
    pub trip_stats: TripStats,
    pub customer_stats: Vec<CustomerTripStats>,
    /// Share rows actually used, explicit or derived from assignments.
    pub shares: Vec<AgentCustomerShare>,
    pub sharing: TripSharing,
}

#[derive(Debug, Clone)]
pub struct AgentSummaryStage {
    pub trip_id: TripId,
    pub summaries: Vec<AgentTripSummary>,
    /// Authoritative total from the sharing breakdown.
    pub breakdown_total: Decimal,
    /// Total re-read from persisted summaries.
    pub summarized_total: Decimal,
}

impl AgentSummaryStage {
    pub fn is_consistent(&self) -> bool {
        self.breakdown_total == self.summarized_total
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentRollupStage {
    pub agent_totals: Vec<(AgentId, AgentTotals)>,
    pub failed_agents: Vec<AgentId>,
}

/// Everything one trip pass produced.
#[derive(Debug, Clone)]
pub struct TripPass {
    pub trip_id: TripId,
    pub refreshed_customers: Vec<CustomerTripStats>,
    pub customer_totals: Vec<(CustomerId, CustomerTotals)>,
    pub trip_stats: TripStats,
    pub sharing: TripSharing,
    pub summaries: Vec<AgentTripSummary>,
    /// Agent share re-read from the persisted summary rows.
    pub summarized_total: Decimal,
    pub agent_totals: Vec<(AgentId, AgentTotals)>,
    pub failed_agents: Vec<AgentId>,
}

impl TripPass {
    /// Persisted summaries agree with the sharing breakdown.
    pub fn summaries_consistent(&self) -> bool {
        self.summarized_total == self.sharing.total_agent_share
    }
}
