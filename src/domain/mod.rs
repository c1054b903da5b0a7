//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, request context, errors)
//! - `billing` - Webhook verification, canonical events and subscription records

pub mod billing;
pub mod foundation;
