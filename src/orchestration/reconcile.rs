//! Full re-derivation of every aggregate, on demand or on a timer.

use crate::domain::{AgentId, CustomerId, TripId};
use crate::engine::summarized_agent_share;
use crate::orchestration::orchestrator::{EntityFailure, OrchestrationError};
use crate::recompute::Recomputer;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub trips: usize,
    pub customers: usize,
    pub agents: usize,
    /// Customers whose cached totals changed during the pass.
    pub drifted_customers: usize,
    pub drifted_agents: usize,
    /// Trips whose persisted agent summaries disagreed with their sharing
    /// breakdown, either as found or after the rebuild.
    pub inconsistent_trips: usize,
    pub failures: Vec<EntityFailure>,
}

/// Rebuilds every trip, then every customer and agent total from scratch.
///
/// Totals are snapshotted first so drift left behind by the incremental
/// path is counted. A failing entity is reported and skipped.
pub async fn reconcile_all(recomputer: &Recomputer) -> Result<ReconcileReport, OrchestrationError> {
    let repo = recomputer.repo();
    let trip_ids = repo.list_trip_ids().await?;
    let customer_ids = repo.list_customer_ids().await?;
    let agent_ids = repo.list_agent_ids().await?;

    let mut customers_before: HashMap<CustomerId, _> = HashMap::new();
    for &customer_id in &customer_ids {
        if let Some(totals) = repo.get_customer_totals(customer_id).await? {
            customers_before.insert(customer_id, totals);
        }
    }
    let mut agents_before: HashMap<AgentId, _> = HashMap::new();
    for &agent_id in &agent_ids {
        if let Some(agent) = repo.get_agent(agent_id).await? {
            agents_before.insert(agent_id, agent.totals);
        }
    }

    let mut report = ReconcileReport {
        trips: trip_ids.len(),
        customers: customer_ids.len(),
        agents: agent_ids.len(),
        ..ReconcileReport::default()
    };

    for &trip_id in &trip_ids {
        let diverged_before = match stored_summaries_diverge(recomputer, trip_id).await {
            Ok(diverged) => diverged,
            Err(e) => {
                warn!(trip_id = %trip_id, error = %e, "Could not read stored trip aggregates");
                false
            }
        };
        match recomputer.recalculate_trip(trip_id).await {
            Ok(pass) => {
                if diverged_before || !pass.summaries_consistent() {
                    warn!(
                        trip_id = %trip_id,
                        diverged_before,
                        summarized_total = %pass.summarized_total,
                        breakdown_total = %pass.sharing.total_agent_share,
                        "Agent summaries disagreed with sharing breakdown"
                    );
                    report.inconsistent_trips += 1;
                }
            }
            Err(e) => {
                warn!(trip_id = %trip_id, error = %e, "Trip reconciliation failed");
                report
                    .failures
                    .push(EntityFailure::new(format!("trip {trip_id}"), e));
            }
        }
    }

    for &customer_id in &customer_ids {
        match recomputer.recompute_customer_global_totals(customer_id).await {
            Ok(after) => {
                if customers_before.get(&customer_id) != Some(&after) {
                    report.drifted_customers += 1;
                }
            }
            Err(e) => {
                warn!(customer_id = %customer_id, error = %e, "Customer reconciliation failed");
                report
                    .failures
                    .push(EntityFailure::new(format!("customer {customer_id}"), e));
            }
        }
    }

    for &agent_id in &agent_ids {
        match recomputer.recompute_agent_global_totals(agent_id).await {
            Ok(after) => {
                if agents_before.get(&agent_id) != Some(&after) {
                    report.drifted_agents += 1;
                }
            }
            Err(e) => {
                warn!(agent_id = %agent_id, error = %e, "Agent reconciliation failed");
                report
                    .failures
                    .push(EntityFailure::new(format!("agent {agent_id}"), e));
            }
        }
    }

    info!(
        trips = report.trips,
        customers = report.customers,
        agents = report.agents,
        drifted_customers = report.drifted_customers,
        drifted_agents = report.drifted_agents,
        inconsistent_trips = report.inconsistent_trips,
        failures = report.failures.len(),
        "Reconciliation finished"
    );
    Ok(report)
}

/// Compares the persisted summary rows of a trip with its persisted sharing
/// row, as left behind by earlier passes.
async fn stored_summaries_diverge(
    recomputer: &Recomputer,
    trip_id: TripId,
) -> Result<bool, sqlx::Error> {
    let repo = recomputer.repo();
    let Some(sharing) = repo.get_trip_sharing(trip_id).await? else {
        return Ok(false);
    };
    let summaries = repo.query_agent_trip_summaries(trip_id).await?;
    Ok(summarized_agent_share(&summaries) != sharing.total_agent_share)
}

/// Runs `reconcile_all` every `period`. The first run happens one full
/// period after start.
pub fn spawn_reconcile_job(recomputer: Recomputer, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = reconcile_all(&recomputer).await {
                error!(error = %e, "Scheduled reconciliation failed");
            }
        }
    })
}
