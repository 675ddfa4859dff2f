//! Derived aggregate rows. These are only ever produced by the recompute
//! pipeline and never edited by hand.

use crate::domain::{AgentId, CustomerId, Decimal, TripId};
use serde::{Deserialize, Serialize};

/// One customer's figures within one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTripStats {
    pub trip_id: TripId,
    pub customer_id: CustomerId,
    pub total_buy_in: Decimal,
    pub total_cash_out: Decimal,
    /// `total_buy_in - total_cash_out`.
    pub total_win_loss: Decimal,
    pub rolling_amount: Decimal,
    pub total_commission_earned: Decimal,
    /// `total_win_loss - total_commission_earned`.
    pub net_result: Decimal,
}

impl CustomerTripStats {
    pub fn zeroed(trip_id: TripId, customer_id: CustomerId) -> Self {
        Self {
            trip_id,
            customer_id,
            total_buy_in: Decimal::zero(),
            total_cash_out: Decimal::zero(),
            total_win_loss: Decimal::zero(),
            rolling_amount: Decimal::zero(),
            total_commission_earned: Decimal::zero(),
            net_result: Decimal::zero(),
        }
    }
}

/// Trip-wide sums of member customers' stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStats {
    pub trip_id: TripId,
    pub customer_count: i64,
    pub total_buy_in: Decimal,
    pub total_cash_out: Decimal,
    pub total_win_loss: Decimal,
    /// Equal to `total_win_loss`; expenses and commission come off in `TripSharing`.
    pub net_profit: Decimal,
}

impl TripStats {
    pub fn zeroed(trip_id: TripId) -> Self {
        Self {
            trip_id,
            customer_count: 0,
            total_buy_in: Decimal::zero(),
            total_cash_out: Decimal::zero(),
            total_win_loss: Decimal::zero(),
            net_profit: Decimal::zero(),
        }
    }
}

/// One agent's line in a trip's profit-sharing breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentShareBreakdown {
    pub agent_id: AgentId,
    /// Rate of the last customer processed for this agent; informational only.
    pub profit_sharing_rate: Decimal,
    pub share_amount: Decimal,
}

/// Split of a trip's net result between agents and the house.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSharing {
    pub trip_id: TripId,
    pub total_win_loss: Decimal,
    pub total_expenses: Decimal,
    pub total_rolling_commission: Decimal,
    /// `total_cash_out - total_buy_in` (customer perspective).
    pub net_cash_flow: Decimal,
    pub net_result: Decimal,
    pub total_agent_share: Decimal,
    pub company_share: Decimal,
    pub agent_share_percentage: Decimal,
    pub company_share_percentage: Decimal,
    pub agent_breakdown: Vec<AgentShareBreakdown>,
}

/// One agent's slice of one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTripSummary {
    pub trip_id: TripId,
    pub agent_id: AgentId,
    pub customer_count: i64,
    pub total_win_loss: Decimal,
    /// Commission generated by the agent's customers' rolling.
    pub total_commission: Decimal,
    /// Sum of the managed customers' net results.
    pub total_profit: Decimal,
    /// The agent's signed profit share from the trip breakdown.
    pub agent_profit_share: Decimal,
}

impl AgentTripSummary {
    pub fn zeroed(trip_id: TripId, agent_id: AgentId) -> Self {
        Self {
            trip_id,
            agent_id,
            customer_count: 0,
            total_win_loss: Decimal::zero(),
            total_commission: Decimal::zero(),
            total_profit: Decimal::zero(),
            agent_profit_share: Decimal::zero(),
        }
    }
}
