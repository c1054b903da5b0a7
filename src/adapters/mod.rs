//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Subscription ledger and user directory over PostgreSQL
//! - `in_memory` - Ledger and directory used by tests and local runs
//! - `email` - Notification delivery (Resend, logging)
//! - `http` - Axum webhook endpoints

pub mod email;
pub mod http;
pub mod in_memory;
pub mod postgres;

pub use email::{LoggingNotificationSink, ResendConfig, ResendNotificationSink};
pub use in_memory::{InMemorySubscriptionLedger, InMemoryUserDirectory, RecordingNotificationSink};
pub use postgres::{PostgresSubscriptionLedger, PostgresUserDirectory};
