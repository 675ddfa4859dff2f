//! Domain types for the junket ledger.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Identifier newtypes for trips, customers, agents and staff
//! - Ledger facts: transactions, rolling entries, expenses, memberships
//! - Derived aggregate rows produced by the recompute pipeline

pub mod aggregates;
pub mod decimal;
pub mod entity;
pub mod expense;
pub mod membership;
pub mod primitives;
pub mod rolling;
pub mod transaction;

pub use aggregates::{
    AgentShareBreakdown, AgentTripSummary, CustomerTripStats, TripSharing, TripStats,
};
pub use decimal::Decimal;
pub use entity::{Agent, AgentTotals, Customer, CustomerTotals, Trip, TripStatus};
pub use expense::{Expense, ExpenseInput};
pub use membership::{AgentCustomerShare, CustomerAgentAssignment};
pub use primitives::{AgentId, CustomerId, StaffId, TimeMs, TripId};
pub use rolling::{commission_for, NewRollingEntry, RollingEntry};
pub use transaction::{NewTransaction, Transaction, TransactionKind, TransactionStatus};
