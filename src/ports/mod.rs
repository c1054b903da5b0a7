//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `SubscriptionLedger` / `LedgerTransaction` - Transactional billing store
//! - `UserDirectory` - Account lookup
//! - `NotificationSink` - Transactional email

mod notification_sink;
mod subscription_ledger;
mod user_directory;

pub use notification_sink::NotificationSink;
pub use subscription_ledger::{LedgerTransaction, SubscriptionLedger};
pub use user_directory::{User, UserDirectory};
