//! Lifetime totals for customers and agents.
//!
//! `*_from_scratch` is authoritative. `apply_membership_delta` is the
//! order-sensitive fast path used only when a customer joins or leaves a trip.

use crate::domain::{AgentTotals, AgentTripSummary, CustomerTotals, CustomerTripStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Joined,
    Left,
}

pub fn customer_totals_from_scratch(rows: &[CustomerTripStats]) -> CustomerTotals {
    rows.iter().fold(CustomerTotals::default(), |mut totals, row| {
        totals.total_rolling += row.rolling_amount;
        totals.total_win_loss += row.total_win_loss;
        totals.total_buy_in += row.total_buy_in;
        totals.total_buy_out += row.total_cash_out;
        totals
    })
}

/// Adds (join) or subtracts (leave) a single trip snapshot.
pub fn apply_membership_delta(
    current: CustomerTotals,
    snapshot: &CustomerTripStats,
    change: MembershipChange,
) -> CustomerTotals {
    let mut next = current;
    match change {
        MembershipChange::Joined => {
            next.total_rolling += snapshot.rolling_amount;
            next.total_win_loss += snapshot.total_win_loss;
            next.total_buy_in += snapshot.total_buy_in;
            next.total_buy_out += snapshot.total_cash_out;
        }
        MembershipChange::Left => {
            next.total_rolling -= snapshot.rolling_amount;
            next.total_win_loss -= snapshot.total_win_loss;
            next.total_buy_in -= snapshot.total_buy_in;
            next.total_buy_out -= snapshot.total_cash_out;
        }
    }
    next
}

/// `summaries` must be the agent's rows for the trips it is a member of.
pub fn agent_totals_from_scratch(summaries: &[AgentTripSummary], trip_count: i64) -> AgentTotals {
    AgentTotals {
        total_commission: summaries.iter().map(|s| s.total_commission).sum(),
        total_profit_share: summaries.iter().map(|s| s.agent_profit_share).sum(),
        total_trips: trip_count,
    }
}
