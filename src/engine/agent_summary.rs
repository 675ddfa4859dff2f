use crate::domain::{
    AgentCustomerShare, AgentId, AgentShareBreakdown, AgentTripSummary, CustomerId,
    CustomerTripStats, Decimal, TripId,
};
use std::collections::{BTreeMap, BTreeSet};

/// Derives one summary per agent from the trip's breakdown.
///
/// `also_zero` lists agents that must get a row even without a breakdown
/// entry (trip members, agents with a previous summary) so that stale rows
/// are overwritten with zeros instead of lingering.
pub fn summarize_agents(
    trip_id: TripId,
    breakdown: &[AgentShareBreakdown],
    shares: &[AgentCustomerShare],
    customer_stats: &[CustomerTripStats],
    also_zero: &BTreeSet<AgentId>,
) -> Vec<AgentTripSummary> {
    let mut managed: BTreeMap<AgentId, BTreeSet<CustomerId>> = BTreeMap::new();
    for share in shares {
        managed
            .entry(share.agent_id)
            .or_default()
            .insert(share.customer_id);
    }

    let mut agents: BTreeSet<AgentId> = breakdown.iter().map(|b| b.agent_id).collect();
    agents.extend(also_zero.iter().copied());

    agents
        .into_iter()
        .map(|agent_id| {
            let mut summary = AgentTripSummary::zeroed(trip_id, agent_id);
            if let Some(customers) = managed.get(&agent_id) {
                summary.customer_count = customers.len() as i64;
                for row in customer_stats
                    .iter()
                    .filter(|s| customers.contains(&s.customer_id))
                {
                    summary.total_win_loss += row.total_win_loss;
                    summary.total_profit += row.net_result;
                    summary.total_commission += row.total_commission_earned;
                }
            }
            summary.agent_profit_share = breakdown
                .iter()
                .find(|b| b.agent_id == agent_id)
                .map(|b| b.share_amount)
                .unwrap_or_default();
            summary
        })
        .collect()
}

/// Sum of the agents' signed shares as recorded on summary rows.
pub fn summarized_agent_share(summaries: &[AgentTripSummary]) -> Decimal {
    summaries.iter().map(|s| s.agent_profit_share).sum()
}
