//! Alias Billing - payment-provider webhook reconciliation
//!
//! This crate verifies Paddle and Coinbase Commerce webhooks and reconciles
//! them into the subscription ledger of an email alias service.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
