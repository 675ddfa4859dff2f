//! Stage-by-stage recomputation of a trip's aggregate pyramid.

use crate::db::Repository;
use crate::domain::{
    Agent, AgentId, AgentTotals, AgentTripSummary, Customer, CustomerId, CustomerTotals,
    CustomerTripStats, Trip, TripId, TripSharing, TripStats,
};
use crate::engine::{
    agent_totals_from_scratch, aggregate_customer_trip, aggregate_trip, apply_membership_delta,
    compute_sharing, customer_totals_from_scratch, effective_shares, summarize_agents,
    summarized_agent_share, MembershipChange, SharingInputs,
};
use crate::recompute::{
    AgentRollupStage, AgentSummaryStage, CustomerStatsStage, PipelineError, SharingStage, Stage,
    StageFailure, TripPass, TripTotalsStage,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs the recompute stages against the repository.
///
/// Every operation is idempotent: running it twice over unchanged ledger
/// facts writes the same rows. The only order-sensitive paths are
/// `on_customer_joins_trip` and `on_customer_leaves_trip`.
#[derive(Clone)]
pub struct Recomputer {
    repo: Arc<Repository>,
}

impl Recomputer {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    // =========================================================================
    // Single-aggregate operations
    // =========================================================================

    /// Rebuilds one customer's stats row for a trip, then the customer's
    /// lifetime totals.
    pub async fn recompute_customer_trip_stats(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<CustomerTripStats, PipelineError> {
        self.require_trip(trip_id).await?;
        let stats = self.refresh_customer_row(trip_id, customer_id).await?;
        self.recompute_customer_global_totals(customer_id).await?;
        Ok(stats)
    }

    pub async fn recompute_trip_stats(&self, trip_id: TripId) -> Result<TripStats, PipelineError> {
        let totals = self
            .trip_totals_stage(CustomerStatsStage::unchanged(trip_id))
            .await?;
        Ok(totals.trip_stats)
    }

    /// Recomputes the trip totals it depends on, then the sharing row.
    pub async fn recompute_trip_sharing(
        &self,
        trip_id: TripId,
    ) -> Result<TripSharing, PipelineError> {
        let totals = self
            .trip_totals_stage(CustomerStatsStage::unchanged(trip_id))
            .await?;
        Ok(self.sharing_stage(totals).await?.sharing)
    }

    /// Recomputes totals and sharing, then derives the agent summaries from
    /// the fresh breakdown.
    pub async fn recompute_agent_trip_summary(
        &self,
        trip_id: TripId,
    ) -> Result<Vec<AgentTripSummary>, PipelineError> {
        let totals = self
            .trip_totals_stage(CustomerStatsStage::unchanged(trip_id))
            .await?;
        let sharing = self.sharing_stage(totals).await?;
        Ok(self.agent_summary_stage(sharing).await?.summaries)
    }

    /// Authoritative customer rollup: re-sums every stats row of the trips
    /// the customer currently belongs to.
    pub async fn recompute_customer_global_totals(
        &self,
        customer_id: CustomerId,
    ) -> Result<CustomerTotals, PipelineError> {
        self.require_customer(customer_id).await?;
        let rows = self
            .repo
            .query_customer_trip_stats_for_customer(customer_id)
            .await?;
        let totals = customer_totals_from_scratch(&rows);
        self.repo.store_customer_totals(customer_id, &totals).await?;
        debug!(customer_id = %customer_id, trips = rows.len(), "Customer totals recomputed");
        Ok(totals)
    }

    pub async fn recompute_agent_global_totals(
        &self,
        agent_id: AgentId,
    ) -> Result<AgentTotals, PipelineError> {
        self.require_agent(agent_id).await?;
        let summaries = self
            .repo
            .query_agent_summaries_in_member_trips(agent_id)
            .await?;
        let trip_count = self.repo.query_trips_for_agent(agent_id).await?.len() as i64;
        let totals = agent_totals_from_scratch(&summaries, trip_count);
        self.repo.store_agent_totals(agent_id, &totals).await?;
        debug!(agent_id = %agent_id, trips = trip_count, "Agent totals recomputed");
        Ok(totals)
    }

    // =========================================================================
    // Membership changes (incremental path)
    // =========================================================================

    /// Adds the customer to the trip with a zeroed stats row and folds that
    /// row into the lifetime totals. A repeated join changes nothing.
    pub async fn on_customer_joins_trip(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<CustomerTotals, PipelineError> {
        self.require_trip(trip_id).await?;
        let customer = self.require_customer(customer_id).await?;

        if !self.repo.add_trip_customer(trip_id, customer_id).await? {
            debug!(trip_id = %trip_id, customer_id = %customer_id, "Customer already on trip");
            return Ok(customer.totals);
        }

        let snapshot = CustomerTripStats::zeroed(trip_id, customer_id);
        self.repo.upsert_customer_trip_stats(&snapshot).await?;
        let totals = apply_membership_delta(customer.totals, &snapshot, MembershipChange::Joined);
        self.repo.store_customer_totals(customer_id, &totals).await?;

        info!(trip_id = %trip_id, customer_id = %customer_id, "Customer joined trip");
        Ok(totals)
    }

    /// Reverse adjustment: subtracts the customer's last trip snapshot from
    /// the lifetime totals, then deletes the stats row and the membership.
    ///
    /// The caller is expected to run a trip pass afterwards.
    pub async fn on_customer_leaves_trip(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<CustomerTotals, PipelineError> {
        self.require_trip(trip_id).await?;
        let customer = self.require_customer(customer_id).await?;
        if !self.repo.is_trip_customer(trip_id, customer_id).await? {
            return Err(PipelineError::NotTripMember {
                trip_id,
                customer_id,
            });
        }

        let snapshot = self
            .repo
            .get_customer_trip_stats(trip_id, customer_id)
            .await?
            .unwrap_or_else(|| CustomerTripStats::zeroed(trip_id, customer_id));

        // must happen while the row still exists
        let totals = apply_membership_delta(customer.totals, &snapshot, MembershipChange::Left);
        self.repo.store_customer_totals(customer_id, &totals).await?;

        self.repo
            .delete_customer_trip_stats(trip_id, customer_id)
            .await?;
        self.repo.remove_trip_customer(trip_id, customer_id).await?;

        info!(
            trip_id = %trip_id,
            customer_id = %customer_id,
            win_loss_removed = %snapshot.total_win_loss,
            "Customer left trip"
        );
        Ok(totals)
    }

    // =========================================================================
    // Trip passes
    // =========================================================================

    /// Runs every stage for a trip, refreshing the given customers first.
    pub async fn run_trip_pass(
        &self,
        trip_id: TripId,
        customers: &[CustomerId],
    ) -> Result<TripPass, StageFailure> {
        let customer_stage = self
            .customer_stats_stage(trip_id, customers)
            .await
            .map_err(|e| StageFailure::new(Stage::CustomerStats, e))?;
        let refreshed_customers = customer_stage.refreshed.clone();
        let customer_totals = customer_stage.customer_totals.clone();

        let totals = self
            .trip_totals_stage(customer_stage)
            .await
            .map_err(|e| StageFailure::new(Stage::TripTotals, e))?;

        let sharing = self
            .sharing_stage(totals)
            .await
            .map_err(|e| StageFailure::new(Stage::Sharing, e))?;
        let trip_stats = sharing.trip_stats.clone();
        let trip_sharing = sharing.sharing.clone();

        let summary = self
            .agent_summary_stage(sharing)
            .await
            .map_err(|e| StageFailure::new(Stage::AgentSummary, e))?;
        let summaries = summary.summaries.clone();
        let summarized_total = summary.summarized_total;

        let rollup = self.agent_rollup_stage(summary).await;

        debug!(
            trip_id = %trip_id,
            customers = refreshed_customers.len(),
            agents = rollup.agent_totals.len(),
            "Trip pass complete"
        );

        Ok(TripPass {
            trip_id,
            refreshed_customers,
            customer_totals,
            trip_stats,
            sharing: trip_sharing,
            summaries,
            summarized_total,
            agent_totals: rollup.agent_totals,
            failed_agents: rollup.failed_agents,
        })
    }

    /// Trip-level stages only; customer rows are taken as persisted.
    pub async fn sync_trip(&self, trip_id: TripId) -> Result<TripPass, StageFailure> {
        self.run_trip_pass(trip_id, &[]).await
    }

    /// Full rebuild of a trip: every member's stats row, then every stage.
    pub async fn recalculate_trip(&self, trip_id: TripId) -> Result<TripPass, StageFailure> {
        let members: Vec<CustomerId> = self
            .repo
            .query_trip_customer_ids(trip_id)
            .await
            .map_err(|e| StageFailure::new(Stage::CustomerStats, e.into()))?
            .into_iter()
            .collect();
        self.run_trip_pass(trip_id, &members).await
    }

    // =========================================================================
    // Stages
    // =========================================================================

    async fn customer_stats_stage(
        &self,
        trip_id: TripId,
        customers: &[CustomerId],
    ) -> Result<CustomerStatsStage, PipelineError> {
        let mut stage = CustomerStatsStage::unchanged(trip_id);
        if customers.is_empty() {
            return Ok(stage);
        }
        self.require_trip(trip_id).await?;

        let unique: BTreeSet<CustomerId> = customers.iter().copied().collect();
        for customer_id in unique {
            let stats = self.refresh_customer_row(trip_id, customer_id).await?;
            let totals = self.recompute_customer_global_totals(customer_id).await?;
            stage.refreshed.push(stats);
            stage.customer_totals.push((customer_id, totals));
        }
        Ok(stage)
    }

    async fn trip_totals_stage(
        &self,
        upstream: CustomerStatsStage,
    ) -> Result<TripTotalsStage, PipelineError> {
        let trip_id = upstream.trip_id;
        self.require_trip(trip_id).await?;

        let members = self.repo.query_trip_customer_ids(trip_id).await?;
        let customer_stats = self.repo.query_member_customer_trip_stats(trip_id).await?;
        let trip_stats = aggregate_trip(trip_id, &members, &customer_stats);
        self.repo.upsert_trip_stats(&trip_stats).await?;

        Ok(TripTotalsStage {
            trip_stats,
            customer_stats,
        })
    }

    async fn sharing_stage(&self, upstream: TripTotalsStage) -> Result<SharingStage, PipelineError> {
        let trip_id = upstream.trip_stats.trip_id;

        let expenses = self.repo.query_expenses(trip_id).await?;
        let rolling = self.repo.query_rolling_entries(trip_id, None).await?;
        let explicit = self
            .repo
            .query_agent_customer_shares(trip_id, None, None)
            .await?;
        let assignments = if explicit.is_empty() {
            self.repo.query_customer_agent_assignments(trip_id).await?
        } else {
            Vec::new()
        };
        let shares = effective_shares(trip_id, explicit, assignments);

        let sharing = compute_sharing(SharingInputs {
            trip_stats: &upstream.trip_stats,
            customer_stats: &upstream.customer_stats,
            expenses: &expenses,
            rolling: &rolling,
            shares: &shares,
        });
        self.repo.store_trip_sharing(&sharing).await?;

        Ok(SharingStage {
            trip_stats: upstream.trip_stats,
            customer_stats: upstream.customer_stats,
            shares,
            sharing,
        })
    }

    async fn agent_summary_stage(
        &self,
        upstream: SharingStage,
    ) -> Result<AgentSummaryStage, PipelineError> {
        let trip_id = upstream.sharing.trip_id;

        // members and agents with an existing row get zeroed rather than left stale
        let mut also_zero = self.repo.query_trip_agent_ids(trip_id).await?;
        also_zero.extend(
            self.repo
                .query_agent_trip_summaries(trip_id)
                .await?
                .into_iter()
                .map(|s| s.agent_id),
        );

        let summaries = summarize_agents(
            trip_id,
            &upstream.sharing.agent_breakdown,
            &upstream.shares,
            &upstream.customer_stats,
            &also_zero,
        );
        self.repo.store_agent_trip_summaries(&summaries).await?;

        let persisted = self.repo.query_agent_trip_summaries(trip_id).await?;
        let stage = AgentSummaryStage {
            trip_id,
            summaries,
            breakdown_total: upstream.sharing.total_agent_share,
            summarized_total: summarized_agent_share(&persisted),
        };
        if !stage.is_consistent() {
            warn!(
                trip_id = %trip_id,
                breakdown_total = %stage.breakdown_total,
                summarized_total = %stage.summarized_total,
                "Agent summaries diverge from sharing breakdown"
            );
        }
        Ok(stage)
    }

    /// Per-agent failures are logged and reported, never propagated.
    async fn agent_rollup_stage(&self, upstream: AgentSummaryStage) -> AgentRollupStage {
        let mut stage = AgentRollupStage::default();
        for summary in &upstream.summaries {
            match self.recompute_agent_global_totals(summary.agent_id).await {
                Ok(totals) => stage.agent_totals.push((summary.agent_id, totals)),
                Err(e) => {
                    error!(
                        trip_id = %upstream.trip_id,
                        agent_id = %summary.agent_id,
                        error = %e,
                        "Agent rollup failed"
                    );
                    stage.failed_agents.push(summary.agent_id);
                }
            }
        }
        stage
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn refresh_customer_row(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<CustomerTripStats, PipelineError> {
        if !self.repo.is_trip_customer(trip_id, customer_id).await? {
            return Err(PipelineError::NotTripMember {
                trip_id,
                customer_id,
            });
        }

        let transactions = self
            .repo
            .query_completed_transactions(trip_id, customer_id)
            .await?;
        let rolling = self
            .repo
            .query_rolling_entries(trip_id, Some(customer_id))
            .await?;
        let stats = aggregate_customer_trip(trip_id, customer_id, &transactions, &rolling);
        self.repo.upsert_customer_trip_stats(&stats).await?;

        debug!(
            trip_id = %trip_id,
            customer_id = %customer_id,
            transactions = transactions.len(),
            rolling_entries = rolling.len(),
            "Customer trip stats recomputed"
        );
        Ok(stats)
    }

    async fn require_trip(&self, trip_id: TripId) -> Result<Trip, PipelineError> {
        self.repo
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("trip {trip_id}")))
    }

    async fn require_customer(&self, customer_id: CustomerId) -> Result<Customer, PipelineError> {
        self.repo
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("customer {customer_id}")))
    }

    async fn require_agent(&self, agent_id: AgentId) -> Result<Agent, PipelineError> {
        self.repo
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("agent {agent_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use crate::domain::{Decimal, NewTransaction, TransactionKind, TransactionStatus, TripStatus};
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_non_member_recompute_is_rejected() {
        let (repo, _temp) = setup_test_db().await;
        let trip = repo.create_trip("T", TripStatus::Active).await.unwrap();
        let customer = repo.create_customer("C", None).await.unwrap();
        let recomputer = Recomputer::new(Arc::new(repo));

        let err = recomputer
            .recompute_customer_trip_stats(trip.id, customer.id)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotTripMember { .. }));
    }

    #[tokio::test]
    async fn test_missing_trip_is_not_found() {
        let (repo, _temp) = setup_test_db().await;
        let recomputer = Recomputer::new(Arc::new(repo));

        let err = recomputer
            .recompute_trip_stats(TripId::new(77))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_leave_subtracts_snapshot_and_drops_row() {
        let (repo, _temp) = setup_test_db().await;
        let trip = repo.create_trip("T", TripStatus::Active).await.unwrap();
        let customer = repo.create_customer("C", None).await.unwrap();
        let recomputer = Recomputer::new(Arc::new(repo));

        recomputer
            .on_customer_joins_trip(trip.id, customer.id)
            .await
            .unwrap();
        recomputer
            .repo()
            .insert_transaction(&NewTransaction {
                trip_id: trip.id,
                customer_id: customer.id,
                agent_id: None,
                amount: d("1000"),
                kind: TransactionKind::BuyIn,
                status: TransactionStatus::Completed,
            })
            .await
            .unwrap();
        recomputer
            .recompute_customer_trip_stats(trip.id, customer.id)
            .await
            .unwrap();

        let totals = recomputer
            .on_customer_leaves_trip(trip.id, customer.id)
            .await
            .unwrap();
        assert_eq!(totals, CustomerTotals::default());
        assert!(recomputer
            .repo()
            .get_customer_trip_stats(trip.id, customer.id)
            .await
            .unwrap()
            .is_none());

        let pass = recomputer.sync_trip(trip.id).await.unwrap();
        assert_eq!(pass.trip_stats, TripStats::zeroed(trip.id));
    }
}
