//! Trip membership and agent profit-sharing links.

use crate::domain::{AgentId, CustomerId, Decimal, TripId};
use serde::{Deserialize, Serialize};

/// The rate (percent) at which `agent_id` shares in `customer_id`'s net
/// result on `trip_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCustomerShare {
    pub trip_id: TripId,
    pub agent_id: AgentId,
    pub customer_id: CustomerId,
    pub profit_sharing_rate: Decimal,
}

/// A member customer's globally assigned agent and that agent's default rate.
/// Used to derive shares when a trip has no explicit share rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerAgentAssignment {
    pub customer_id: CustomerId,
    pub agent_id: AgentId,
    pub commission_rate: Decimal,
}

impl CustomerAgentAssignment {
    pub fn into_share(self, trip_id: TripId) -> AgentCustomerShare {
        AgentCustomerShare {
            trip_id,
            agent_id: self.agent_id,
            customer_id: self.customer_id,
            profit_sharing_rate: self.commission_rate,
        }
    }
}
