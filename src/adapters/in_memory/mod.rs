//! In-memory adapters for tests and local development.
//!
//! - `InMemorySubscriptionLedger` - Transactional ledger over a staged copy
//! - `InMemoryUserDirectory` - Fixed set of accounts
//! - `RecordingNotificationSink` - Captures outgoing email

mod notification_sink;
mod subscription_ledger;
mod user_directory;

pub use notification_sink::{RecordingNotificationSink, SentEmail};
pub use subscription_ledger::{InMemoryLedgerTransaction, InMemorySubscriptionLedger, LedgerState};
pub use user_directory::InMemoryUserDirectory;
