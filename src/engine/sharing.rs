//! Profit-sharing between agents and the house.
//!
//! Every agent share follows one formula, `net_result_c * rate / 100`, so a
//! losing customer makes the agent absorb a proportional loss. Only the
//! percentage fields are rounded; amounts stay exact so that
//! `company_share + total_agent_share == net_result` always holds.

use crate::domain::{
    AgentCustomerShare, AgentId, AgentShareBreakdown, CustomerAgentAssignment, CustomerTripStats,
    Decimal, Expense, RollingEntry, TripId, TripSharing, TripStats,
};
use crate::engine::trip::member_net_result;
use std::collections::BTreeMap;

/// Everything the calculator reads for one trip.
#[derive(Debug, Clone, Copy)]
pub struct SharingInputs<'a> {
    pub trip_stats: &'a TripStats,
    pub customer_stats: &'a [CustomerTripStats],
    pub expenses: &'a [Expense],
    pub rolling: &'a [RollingEntry],
    pub shares: &'a [AgentCustomerShare],
}

/// Picks the share rows used for a trip.
///
/// Explicit (agent, customer, rate) rows win. When a trip has none, rows are
/// derived from each member's assigned agent at that agent's default rate so
/// the breakdown is never empty while any customer has an agent.
pub fn effective_shares(
    trip_id: TripId,
    explicit: Vec<AgentCustomerShare>,
    assignments: Vec<CustomerAgentAssignment>,
) -> Vec<AgentCustomerShare> {
    let mut shares = if explicit.is_empty() {
        assignments
            .into_iter()
            .map(|a| a.into_share(trip_id))
            .collect()
    } else {
        explicit
    };
    shares.sort_by_key(|s| (s.agent_id, s.customer_id));
    shares
}

/// Per-agent share of the trip, ordered by agent id.
///
/// Customers are processed in ascending id within an agent, so the reported
/// rate is that of the agent's highest-id customer.
pub fn compute_breakdown(
    shares: &[AgentCustomerShare],
    customer_stats: &[CustomerTripStats],
) -> Vec<AgentShareBreakdown> {
    let mut ordered: Vec<&AgentCustomerShare> = shares.iter().collect();
    ordered.sort_by_key(|s| (s.agent_id, s.customer_id));

    let mut per_agent: BTreeMap<AgentId, AgentShareBreakdown> = BTreeMap::new();
    for share in ordered {
        let net_result = member_net_result(customer_stats, share.customer_id);
        let amount = agent_share(net_result, share.profit_sharing_rate);

        let entry = per_agent
            .entry(share.agent_id)
            .or_insert_with(|| AgentShareBreakdown {
                agent_id: share.agent_id,
                profit_sharing_rate: share.profit_sharing_rate,
                share_amount: Decimal::zero(),
            });
        entry.profit_sharing_rate = share.profit_sharing_rate;
        entry.share_amount += amount;
    }

    per_agent.into_values().collect()
}

/// `net_result * rate / 100`, identical for profits and losses.
pub fn agent_share(net_result: Decimal, profit_sharing_rate: Decimal) -> Decimal {
    if net_result.is_zero() {
        return Decimal::zero();
    }
    net_result * profit_sharing_rate / Decimal::hundred()
}

/// Magnitude-only split percentages, each rounded to 2 dp.
pub fn share_percentages(total_agent_share: Decimal, company_share: Decimal) -> (Decimal, Decimal) {
    let total_amount = total_agent_share.abs() + company_share.abs();
    if !total_amount.is_positive() {
        return (Decimal::zero(), Decimal::zero());
    }
    let pct = |part: Decimal| {
        part.abs()
            .checked_div(total_amount)
            .map(|ratio| (ratio * Decimal::hundred()).round_dp(2))
            .unwrap_or_default()
    };
    (pct(total_agent_share), pct(company_share))
}

/// Computes the full sharing row for a trip.
pub fn compute_sharing(inputs: SharingInputs<'_>) -> TripSharing {
    let stats = inputs.trip_stats;
    let total_expenses: Decimal = inputs.expenses.iter().map(|e| e.amount).sum();
    let total_rolling_commission: Decimal =
        inputs.rolling.iter().map(|r| r.commission_earned).sum();

    let has_customers = stats.customer_count > 0;
    let (net_cash_flow, net_result) = if has_customers {
        (
            stats.total_cash_out - stats.total_buy_in,
            stats.net_profit - total_expenses - total_rolling_commission,
        )
    } else {
        (Decimal::zero(), -total_expenses)
    };

    let agent_breakdown = compute_breakdown(inputs.shares, inputs.customer_stats);
    let total_agent_share: Decimal = agent_breakdown.iter().map(|b| b.share_amount).sum();
    let company_share = net_result - total_agent_share;
    let (agent_share_percentage, company_share_percentage) =
        share_percentages(total_agent_share, company_share);

    TripSharing {
        trip_id: stats.trip_id,
        total_win_loss: stats.total_win_loss,
        total_expenses,
        total_rolling_commission,
        net_cash_flow,
        net_result,
        total_agent_share,
        company_share,
        agent_share_percentage,
        company_share_percentage,
        agent_breakdown,
    }
}
