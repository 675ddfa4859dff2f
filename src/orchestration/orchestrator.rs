use crate::db::Repository;
use crate::domain::{
    Agent, AgentCustomerShare, AgentId, Customer, CustomerId, CustomerTotals, Decimal, Expense,
    ExpenseInput, NewRollingEntry, NewTransaction, RollingEntry, StaffId, Transaction,
    TransactionStatus, Trip, TripId, TripStatus,
};
use crate::orchestration::reconcile::{reconcile_all, ReconcileReport};
use crate::recompute::{PipelineError, Recomputer, Stage, StageFailure, TripPass};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Entry point for every mutating operation.
///
/// A mutation commits its ledger change first and then runs the recompute
/// stages. If a stage fails the mutation still succeeds and its outcome is
/// reported as stale together with the failing stage.
#[derive(Clone)]
pub struct Orchestrator {
    repo: Arc<Repository>,
    recomputer: Recomputer,
    fallback_rolling_rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyStatus {
    Synced,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Consistency {
    pub status: ConsistencyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Consistency {
    pub fn synced() -> Self {
        Self {
            status: ConsistencyStatus::Synced,
            stage: None,
            error: None,
        }
    }

    pub fn stale(stage: Stage, error: String) -> Self {
        Self {
            status: ConsistencyStatus::Stale,
            stage: Some(stage),
            error: Some(error),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.status == ConsistencyStatus::Synced
    }

    fn from_pass(trip_id: TripId, result: Result<TripPass, StageFailure>) -> Self {
        match result {
            Ok(pass) if pass.failed_agents.is_empty() => Self::synced(),
            Ok(pass) => Self::stale(
                Stage::AgentRollup,
                format!("rollup failed for {} agent(s)", pass.failed_agents.len()),
            ),
            Err(failure) => {
                error!(
                    trip_id = %trip_id,
                    stage = %failure.stage,
                    error = %failure.source,
                    "Recompute failed after mutation"
                );
                Self::stale(failure.stage, failure.source.to_string())
            }
        }
    }
}

/// A committed mutation plus the consistency of the aggregates behind it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome<T> {
    pub record: T,
    pub consistency: Consistency,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMembership {
    pub trip_id: TripId,
    pub customer_id: CustomerId,
    pub customer_totals: CustomerTotals,
}

#[derive(Debug, Clone)]
pub struct RollingInput {
    pub customer_id: CustomerId,
    pub staff_id: Option<StaffId>,
    pub game_type: String,
    pub rolling_amount: Decimal,
    /// Falls back to the stored default rate when absent.
    pub commission_rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFailure {
    pub entity: String,
    pub error: String,
}

impl EntityFailure {
    pub fn new(entity: impl Into<String>, error: impl ToString) -> Self {
        Self {
            entity: entity.into(),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub succeeded: Vec<i64>,
    pub failures: Vec<EntityFailure>,
}

impl Orchestrator {
    pub fn new(repo: Arc<Repository>, fallback_rolling_rate: Decimal) -> Self {
        let recomputer = Recomputer::new(repo.clone());
        Self {
            repo,
            recomputer,
            fallback_rolling_rate,
        }
    }

    pub fn recomputer(&self) -> &Recomputer {
        &self.recomputer
    }

    // =========================================================================
    // Entities
    // =========================================================================

    pub async fn create_trip(
        &self,
        name: &str,
        status: TripStatus,
    ) -> Result<MutationOutcome<Trip>, OrchestrationError> {
        require_name(name)?;
        let trip = self.repo.create_trip(name.trim(), status).await?;
        let consistency = self.sync(trip.id, &[]).await;
        info!(trip_id = %trip.id, "Trip created");
        Ok(MutationOutcome {
            record: trip,
            consistency,
        })
    }

    pub async fn create_customer(
        &self,
        name: &str,
        agent_id: Option<AgentId>,
    ) -> Result<Customer, OrchestrationError> {
        require_name(name)?;
        if let Some(agent_id) = agent_id {
            self.require_agent(agent_id).await?;
        }
        Ok(self.repo.create_customer(name.trim(), agent_id).await?)
    }

    pub async fn create_agent(
        &self,
        name: &str,
        commission_rate: Decimal,
    ) -> Result<Agent, OrchestrationError> {
        require_name(name)?;
        require_percentage("commissionRate", commission_rate)?;
        Ok(self.repo.create_agent(name.trim(), commission_rate).await?)
    }

    /// Marks each trip completed and rebuilds it. One trip failing does not
    /// stop the others.
    pub async fn complete_trips(&self, trip_ids: &[TripId]) -> BatchReport {
        let mut report = BatchReport::default();
        for &trip_id in trip_ids {
            match self.complete_one(trip_id).await {
                Ok(failed_agents) => {
                    report.succeeded.push(trip_id.as_i64());
                    for agent_id in failed_agents {
                        report.failures.push(EntityFailure::new(
                            format!("agent {agent_id}"),
                            "agent rollup failed",
                        ));
                    }
                }
                Err(e) => {
                    warn!(trip_id = %trip_id, error = %e, "Trip completion failed");
                    report
                        .failures
                        .push(EntityFailure::new(format!("trip {trip_id}"), e));
                }
            }
        }
        info!(
            completed = report.succeeded.len(),
            failed = report.failures.len(),
            "Bulk trip completion finished"
        );
        report
    }

    /// Returns the agents whose rollup failed.
    async fn complete_one(&self, trip_id: TripId) -> Result<Vec<AgentId>, OrchestrationError> {
        if !self
            .repo
            .set_trip_status(trip_id, TripStatus::Completed)
            .await?
        {
            return Err(OrchestrationError::NotFound(format!("trip {trip_id}")));
        }
        let pass = self.recomputer.recalculate_trip(trip_id).await?;
        Ok(pass.failed_agents)
    }

    /// Deletes a trip with everything hanging off it, then rebuilds the
    /// lifetime totals of every customer and agent that was involved.
    pub async fn delete_trip(&self, trip_id: TripId) -> Result<BatchReport, OrchestrationError> {
        self.require_trip(trip_id).await?;

        let customers = self.repo.query_trip_customer_ids(trip_id).await?;
        let mut agents = self.repo.query_trip_agent_ids(trip_id).await?;
        agents.extend(
            self.repo
                .query_agent_trip_summaries(trip_id)
                .await?
                .into_iter()
                .map(|s| s.agent_id),
        );

        self.repo.delete_trip(trip_id).await?;
        info!(trip_id = %trip_id, customers = customers.len(), agents = agents.len(), "Trip deleted");

        Ok(self.rebuild_totals(&customers, &agents).await)
    }

    // =========================================================================
    // Membership
    // =========================================================================

    pub async fn add_customer_to_trip(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<MutationOutcome<TripMembership>, OrchestrationError> {
        let customer = self.require_customer(customer_id).await?;
        let mut customer_totals = self
            .recomputer
            .on_customer_joins_trip(trip_id, customer_id)
            .await?;

        if let Some(agent_id) = customer.agent_id {
            if self.repo.add_trip_agent(trip_id, agent_id).await? {
                info!(trip_id = %trip_id, agent_id = %agent_id, "Assigned agent joined trip");
            }
        }

        // a returning customer may already have facts on this trip
        let pass = self.recomputer.run_trip_pass(trip_id, &[customer_id]).await;
        if let Some((_, totals)) = pass
            .as_ref()
            .ok()
            .and_then(|p| p.customer_totals.iter().find(|(id, _)| *id == customer_id))
        {
            customer_totals = *totals;
        }

        Ok(MutationOutcome {
            record: TripMembership {
                trip_id,
                customer_id,
                customer_totals,
            },
            consistency: Consistency::from_pass(trip_id, pass),
        })
    }

    pub async fn remove_customer_from_trip(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<MutationOutcome<TripMembership>, OrchestrationError> {
        let customer_totals = self
            .recomputer
            .on_customer_leaves_trip(trip_id, customer_id)
            .await?;
        let consistency = self.sync(trip_id, &[]).await;
        Ok(MutationOutcome {
            record: TripMembership {
                trip_id,
                customer_id,
                customer_totals,
            },
            consistency,
        })
    }

    pub async fn add_agent_to_trip(
        &self,
        trip_id: TripId,
        agent_id: AgentId,
    ) -> Result<MutationOutcome<Agent>, OrchestrationError> {
        self.require_trip(trip_id).await?;
        let agent = self.require_agent(agent_id).await?;
        self.repo.add_trip_agent(trip_id, agent_id).await?;
        let consistency = self.sync(trip_id, &[]).await;
        Ok(MutationOutcome {
            record: agent,
            consistency,
        })
    }

    /// Takes the agent off the trip along with its share rows and summary,
    /// then rebuilds the trip and the agent's lifetime totals, which no
    /// longer include this trip.
    pub async fn remove_agent_from_trip(
        &self,
        trip_id: TripId,
        agent_id: AgentId,
    ) -> Result<MutationOutcome<Agent>, OrchestrationError> {
        self.require_trip(trip_id).await?;
        self.require_agent(agent_id).await?;
        if !self.repo.remove_trip_agent(trip_id, agent_id).await? {
            return Err(OrchestrationError::NotFound(format!(
                "agent {agent_id} on trip {trip_id}"
            )));
        }
        info!(trip_id = %trip_id, agent_id = %agent_id, "Agent removed from trip");

        let mut consistency = self.sync(trip_id, &[]).await;
        if let Err(e) = self.recomputer.recompute_agent_global_totals(agent_id).await {
            error!(agent_id = %agent_id, error = %e, "Agent rollup failed after removal");
            if consistency.is_synced() {
                consistency = Consistency::stale(Stage::AgentRollup, e.to_string());
            }
        }

        let agent = self.require_agent(agent_id).await?;
        Ok(MutationOutcome {
            record: agent,
            consistency,
        })
    }

    /// Sets the rate at which an agent shares in a member customer's result.
    /// Without an explicit rate the agent's default commission rate applies.
    pub async fn set_agent_customer_share(
        &self,
        trip_id: TripId,
        agent_id: AgentId,
        customer_id: CustomerId,
        rate: Option<Decimal>,
    ) -> Result<MutationOutcome<AgentCustomerShare>, OrchestrationError> {
        self.require_trip(trip_id).await?;
        let agent = self.require_agent(agent_id).await?;
        self.require_member(trip_id, customer_id).await?;

        let profit_sharing_rate = rate.unwrap_or(agent.commission_rate);
        require_percentage("profitSharingRate", profit_sharing_rate)?;

        let share = AgentCustomerShare {
            trip_id,
            agent_id,
            customer_id,
            profit_sharing_rate,
        };
        self.repo.upsert_agent_customer_share(&share).await?;

        let consistency = self.sync(trip_id, &[]).await;
        Ok(MutationOutcome {
            record: share,
            consistency,
        })
    }

    pub async fn delete_agent_customer_share(
        &self,
        trip_id: TripId,
        agent_id: AgentId,
        customer_id: CustomerId,
    ) -> Result<MutationOutcome<()>, OrchestrationError> {
        if !self
            .repo
            .delete_agent_customer_share(trip_id, agent_id, customer_id)
            .await?
        {
            return Err(OrchestrationError::NotFound(format!(
                "share of agent {agent_id} in customer {customer_id} on trip {trip_id}"
            )));
        }
        let consistency = self.sync(trip_id, &[]).await;
        Ok(MutationOutcome {
            record: (),
            consistency,
        })
    }

    // =========================================================================
    // Ledger facts
    // =========================================================================

    pub async fn record_transaction(
        &self,
        input: NewTransaction,
    ) -> Result<MutationOutcome<Transaction>, OrchestrationError> {
        self.require_trip(input.trip_id).await?;
        self.require_member(input.trip_id, input.customer_id).await?;
        if !input.kind.is_supported() {
            return Err(OrchestrationError::InvalidInput(format!(
                "unsupported transaction type: {}",
                input.kind.as_str()
            )));
        }
        require_positive("amount", input.amount)?;
        if let Some(agent_id) = input.agent_id {
            self.require_agent(agent_id).await?;
        }

        let transaction = self.repo.insert_transaction(&input).await?;
        let consistency = self.sync(input.trip_id, &[input.customer_id]).await;
        Ok(MutationOutcome {
            record: transaction,
            consistency,
        })
    }

    pub async fn set_transaction_status(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<MutationOutcome<Transaction>, OrchestrationError> {
        let mut transaction = self
            .repo
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("transaction {transaction_id}")))?;

        self.repo
            .update_transaction_status(transaction_id, status)
            .await?;
        transaction.status = status;

        let consistency = self
            .sync_if_member(transaction.trip_id, transaction.customer_id)
            .await?;
        Ok(MutationOutcome {
            record: transaction,
            consistency,
        })
    }

    pub async fn record_rolling(
        &self,
        trip_id: TripId,
        input: RollingInput,
    ) -> Result<MutationOutcome<RollingEntry>, OrchestrationError> {
        self.require_trip(trip_id).await?;
        self.require_member(trip_id, input.customer_id).await?;
        require_positive("rollingAmount", input.rolling_amount)?;
        if input.game_type.trim().is_empty() {
            return Err(OrchestrationError::InvalidInput(
                "gameType must not be empty".to_string(),
            ));
        }

        let commission_rate = match input.commission_rate {
            Some(rate) => rate,
            None => self.rolling_commission_rate().await?,
        };
        require_fraction("commissionRate", commission_rate)?;

        let entry = self
            .repo
            .insert_rolling_entry(&NewRollingEntry {
                trip_id,
                customer_id: input.customer_id,
                staff_id: input.staff_id,
                game_type: input.game_type.trim().to_string(),
                rolling_amount: input.rolling_amount,
                commission_rate,
            })
            .await?;

        let consistency = self.sync(trip_id, &[input.customer_id]).await;
        Ok(MutationOutcome {
            record: entry,
            consistency,
        })
    }

    pub async fn delete_rolling(
        &self,
        entry_id: i64,
    ) -> Result<MutationOutcome<RollingEntry>, OrchestrationError> {
        let entry = self
            .repo
            .get_rolling_entry(entry_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("rolling entry {entry_id}")))?;
        self.repo.delete_rolling_entry(entry_id).await?;

        let consistency = self.sync_if_member(entry.trip_id, entry.customer_id).await?;
        Ok(MutationOutcome {
            record: entry,
            consistency,
        })
    }

    pub async fn add_expense(
        &self,
        trip_id: TripId,
        input: ExpenseInput,
    ) -> Result<MutationOutcome<Expense>, OrchestrationError> {
        self.require_trip(trip_id).await?;
        validate_expense(&input)?;
        let expense = self.repo.insert_expense(trip_id, &input).await?;
        let consistency = self.sync(trip_id, &[]).await;
        Ok(MutationOutcome {
            record: expense,
            consistency,
        })
    }

    pub async fn update_expense(
        &self,
        expense_id: i64,
        input: ExpenseInput,
    ) -> Result<MutationOutcome<Expense>, OrchestrationError> {
        validate_expense(&input)?;
        let existing = self
            .repo
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("expense {expense_id}")))?;
        self.repo.update_expense(expense_id, &input).await?;

        let consistency = self.sync(existing.trip_id, &[]).await;
        Ok(MutationOutcome {
            record: Expense {
                id: expense_id,
                trip_id: existing.trip_id,
                expense_type: input.expense_type,
                amount: input.amount,
                expense_date: input.expense_date,
                description: input.description,
            },
            consistency,
        })
    }

    pub async fn delete_expense(
        &self,
        expense_id: i64,
    ) -> Result<MutationOutcome<Expense>, OrchestrationError> {
        let expense = self
            .repo
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("expense {expense_id}")))?;
        self.repo.delete_expense(expense_id).await?;

        let consistency = self.sync(expense.trip_id, &[]).await;
        Ok(MutationOutcome {
            record: expense,
            consistency,
        })
    }

    // =========================================================================
    // Settings and maintenance
    // =========================================================================

    pub async fn rolling_commission_rate(&self) -> Result<Decimal, OrchestrationError> {
        Ok(self
            .repo
            .get_rolling_commission_rate()
            .await?
            .unwrap_or(self.fallback_rolling_rate))
    }

    /// Only affects entries recorded afterwards.
    pub async fn set_rolling_commission_rate(
        &self,
        rate: Decimal,
    ) -> Result<Decimal, OrchestrationError> {
        require_fraction("rate", rate)?;
        self.repo.set_rolling_commission_rate(rate).await?;
        info!(rate = %rate, "Default rolling commission rate updated");
        Ok(rate)
    }

    pub async fn recalculate_trip(&self, trip_id: TripId) -> Result<TripPass, OrchestrationError> {
        self.require_trip(trip_id).await?;
        Ok(self.recomputer.recalculate_trip(trip_id).await?)
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport, OrchestrationError> {
        reconcile_all(&self.recomputer).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn sync(&self, trip_id: TripId, customers: &[CustomerId]) -> Consistency {
        let result = self.recomputer.run_trip_pass(trip_id, customers).await;
        Consistency::from_pass(trip_id, result)
    }

    /// A fact of a customer who has since left the trip only affects
    /// trip-level aggregates.
    async fn sync_if_member(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<Consistency, OrchestrationError> {
        if self.repo.is_trip_customer(trip_id, customer_id).await? {
            Ok(self.sync(trip_id, &[customer_id]).await)
        } else {
            Ok(self.sync(trip_id, &[]).await)
        }
    }

    async fn rebuild_totals(
        &self,
        customers: &BTreeSet<CustomerId>,
        agents: &BTreeSet<AgentId>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for &customer_id in customers {
            match self
                .recomputer
                .recompute_customer_global_totals(customer_id)
                .await
            {
                Ok(_) => report.succeeded.push(customer_id.as_i64()),
                Err(e) => {
                    warn!(customer_id = %customer_id, error = %e, "Customer rollup failed");
                    report
                        .failures
                        .push(EntityFailure::new(format!("customer {customer_id}"), e));
                }
            }
        }
        for &agent_id in agents {
            match self.recomputer.recompute_agent_global_totals(agent_id).await {
                Ok(_) => report.succeeded.push(agent_id.as_i64()),
                Err(e) => {
                    warn!(agent_id = %agent_id, error = %e, "Agent rollup failed");
                    report
                        .failures
                        .push(EntityFailure::new(format!("agent {agent_id}"), e));
                }
            }
        }
        report
    }

    async fn require_trip(&self, trip_id: TripId) -> Result<Trip, OrchestrationError> {
        self.repo
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("trip {trip_id}")))
    }

    async fn require_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Customer, OrchestrationError> {
        self.repo
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("customer {customer_id}")))
    }

    async fn require_agent(&self, agent_id: AgentId) -> Result<Agent, OrchestrationError> {
        self.repo
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("agent {agent_id}")))
    }

    async fn require_member(
        &self,
        trip_id: TripId,
        customer_id: CustomerId,
    ) -> Result<(), OrchestrationError> {
        self.require_customer(customer_id).await?;
        if self.repo.is_trip_customer(trip_id, customer_id).await? {
            Ok(())
        } else {
            Err(PipelineError::NotTripMember {
                trip_id,
                customer_id,
            }
            .into())
        }
    }
}

fn require_name(name: &str) -> Result<(), OrchestrationError> {
    if name.trim().is_empty() {
        return Err(OrchestrationError::InvalidInput(
            "name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn require_positive(field: &str, value: Decimal) -> Result<(), OrchestrationError> {
    if !value.is_positive() {
        return Err(OrchestrationError::InvalidInput(format!(
            "{field} must be greater than zero"
        )));
    }
    require_within_limit(field, value)
}

fn require_within_limit(field: &str, value: Decimal) -> Result<(), OrchestrationError> {
    let limit = Decimal::max_ledger_amount();
    if value > limit {
        return Err(OrchestrationError::InvalidInput(format!(
            "{field} must not exceed {limit}"
        )));
    }
    Ok(())
}

/// Percentages are stored as 0..=100.
fn require_percentage(field: &str, value: Decimal) -> Result<(), OrchestrationError> {
    if value.is_negative() || value > Decimal::hundred() {
        return Err(OrchestrationError::InvalidInput(format!(
            "{field} must be between 0 and 100"
        )));
    }
    Ok(())
}

/// Rolling commission rates are fractions, e.g. 0.014.
fn require_fraction(field: &str, value: Decimal) -> Result<(), OrchestrationError> {
    if value.is_negative() || value >= Decimal::from(1i64) {
        return Err(OrchestrationError::InvalidInput(format!(
            "{field} must be at least 0 and below 1"
        )));
    }
    Ok(())
}

fn validate_expense(input: &ExpenseInput) -> Result<(), OrchestrationError> {
    if input.expense_type.trim().is_empty() {
        return Err(OrchestrationError::InvalidInput(
            "expenseType must not be empty".to_string(),
        ));
    }
    if input.amount.is_negative() {
        return Err(OrchestrationError::InvalidInput(
            "amount must not be negative".to_string(),
        ));
    }
    require_within_limit("amount", input.amount)
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Stage(#[from] StageFailure),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(require_percentage("rate", d("0")).is_ok());
        assert!(require_percentage("rate", d("100")).is_ok());
        assert!(require_percentage("rate", d("100.01")).is_err());
        assert!(require_percentage("rate", d("-1")).is_err());
    }

    #[test]
    fn test_amount_limit() {
        assert!(require_positive("amount", d("1000000000000000")).is_ok());
        assert!(require_positive("amount", d("1000000000000000.01")).is_err());
        assert!(require_positive("amount", d("10000000000000000000000000000")).is_err());

        let expense = ExpenseInput {
            expense_type: "hotel".to_string(),
            amount: d("10000000000000000"),
            expense_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            description: None,
        };
        assert!(matches!(
            validate_expense(&expense),
            Err(OrchestrationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fraction_bounds() {
        assert!(require_fraction("rate", d("0.014")).is_ok());
        assert!(require_fraction("rate", d("1")).is_err());
        assert!(require_fraction("rate", d("-0.01")).is_err());
    }

    #[test]
    fn test_stale_consistency_serializes_stage() {
        let consistency = Consistency::stale(Stage::Sharing, "boom".to_string());
        let json = serde_json::to_value(&consistency).unwrap();
        assert_eq!(json["status"], "stale");
        assert_eq!(json["stage"], "sharing");
        assert_eq!(json["error"], "boom");

        let json = serde_json::to_value(Consistency::synced()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "synced"}));
    }
}
