pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod recompute;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    AgentId, AgentTripSummary, CustomerId, CustomerTripStats, Decimal, TimeMs, TripId,
    TripSharing, TripStats,
};
pub use error::AppError;
pub use orchestration::{MutationOutcome, Orchestrator};
pub use recompute::{PipelineError, Recomputer};
