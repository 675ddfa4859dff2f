//! Pure computation engine for the aggregate pyramid.
//!
//! Nothing here touches storage; the recompute pipeline feeds these functions
//! with ledger facts and persists what they return.

pub mod agent_summary;
pub mod customer_trip;
pub mod rollup;
pub mod sharing;
pub mod trip;

pub use agent_summary::{summarize_agents, summarized_agent_share};
pub use customer_trip::aggregate_customer_trip;
pub use rollup::{
    agent_totals_from_scratch, apply_membership_delta, customer_totals_from_scratch,
    MembershipChange,
};
pub use sharing::{
    agent_share, compute_breakdown, compute_sharing, effective_shares, share_percentages,
    SharingInputs,
};
pub use trip::{aggregate_trip, member_net_result};
