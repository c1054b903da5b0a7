//! HTTP adapters - webhook endpoints.

pub mod billing;

// Re-export key types for convenience
pub use billing::billing_router;
pub use billing::BillingAppState;
