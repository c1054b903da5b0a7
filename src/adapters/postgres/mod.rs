//! PostgreSQL adapters - Database implementations for billing ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresSubscriptionLedger` - Transactional subscription/coupon storage
//! - `PostgresUserDirectory` - Read-only account lookup

mod subscription_ledger;
mod user_directory;

pub use subscription_ledger::{PostgresLedgerTransaction, PostgresSubscriptionLedger};
pub use user_directory::PostgresUserDirectory;
