//! Mutation handling and reconciliation on top of the recompute pipeline.

pub mod orchestrator;
pub mod reconcile;

pub use orchestrator::{
    BatchReport, Consistency, ConsistencyStatus, EntityFailure, MutationOutcome,
    OrchestrationError, Orchestrator, RollingInput, TripMembership,
};
pub use reconcile::{reconcile_all, spawn_reconcile_job, ReconcileReport};
