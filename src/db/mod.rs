//! SQLite persistence for the junket ledger.
//!
//! - `migrations` opens the pool, applies the WAL and foreign-key pragmas on
//!   every connection and creates the schema idempotently.
//! - `repo` holds the `Repository`, split into entities with their cached
//!   lifetime totals, ledger facts, trip membership with agent share rates,
//!   and the derived aggregate rows.
//! - The `settings` table keeps the runtime default rolling commission rate.

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
