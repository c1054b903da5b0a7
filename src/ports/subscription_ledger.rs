//! Subscription ledger port.
//!
//! The ledger is the only owner of `Subscription`, `CoinbaseSubscription` and
//! `Coupon` records. Every inbound webhook stages its writes in a single
//! [`LedgerTransaction`] that either commits as a whole or leaves nothing
//! behind.
//!
//! # Design
//!
//! - **Scoped acquisition**: a transaction handle dropped without `commit`
//!   rolls back, so early returns and `?` never leak partial writes
//! - **Serialized reads**: reads made through a transaction lock the rows
//!   they return (or the user they are keyed on) until commit, so two
//!   concurrent deliveries for the same user apply one after the other
//!
//! # Example
//!
//! ```ignore
//! let mut tx = ledger.begin().await?;
//! if let Some(mut sub) = tx.get_by_subscription_id("sub_1").await? {
//!     sub.cancel(ctx.now());
//!     tx.upsert(&sub).await?;
//! }
//! tx.commit().await?;
//! ```

use async_trait::async_trait;

use crate::domain::billing::{CoinbaseSubscription, Coupon, Subscription};
use crate::domain::foundation::{DomainError, UserId};

/// Factory for request-scoped ledger transactions.
#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` if no connection could be acquired
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, DomainError>;
}

/// One open ledger transaction.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Paddle subscription of a user, locking that user for the rest of the
    /// transaction.
    async fn get_by_user(&mut self, user_id: UserId) -> Result<Option<Subscription>, DomainError>;

    /// Paddle subscription with the given provider id, locked for update.
    async fn get_by_subscription_id(
        &mut self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Inserts or replaces the user's subscription row.
    ///
    /// # Errors
    ///
    /// - `SubscriptionConflict` if `subscription_id` already belongs to another user
    /// - `DatabaseError` on persistence failure
    async fn upsert(&mut self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Hard-deletes the row with the given provider id.
    ///
    /// Returns `false` if there was no such row.
    async fn delete(&mut self, subscription_id: &str) -> Result<bool, DomainError>;

    /// Coinbase subscription of a user, locking that user for the rest of the
    /// transaction.
    async fn get_coinbase_by_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<CoinbaseSubscription>, DomainError>;

    /// Inserts or replaces the user's Coinbase subscription.
    async fn upsert_coinbase(&mut self, subscription: &CoinbaseSubscription) -> Result<(), DomainError>;

    /// Persists a freshly issued coupon.
    ///
    /// # Errors
    ///
    /// - `SubscriptionConflict` if the code already exists
    /// - `DatabaseError` on persistence failure
    async fn insert_coupon(&mut self, coupon: &Coupon) -> Result<(), DomainError>;

    /// Makes every staged write durable.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discards every staged write. Equivalent to dropping the handle.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}
