//! Coinbase Commerce prepaid subscription.
//!
//! Each confirmed charge buys one year. There is no stored status: a record
//! is active while `end_at` lies in the future and expired afterwards, and
//! it can cycle between the two indefinitely.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// Length of the period bought by one confirmed charge.
pub const YEARS_PER_CHARGE: u32 = 1;

/// Derived lifecycle state of a [`CoinbaseSubscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinbaseState {
    Active,
    Expired,
}

/// What a confirmed charge did to an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeApplied {
    /// State the record was in before the charge.
    pub previous_state: CoinbaseState,
    /// Stored charge code before the charge, when it differed.
    pub replaced_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseSubscription {
    pub user_id: UserId,
    pub end_at: Timestamp,
    /// Last charge code seen for this user. Not a deduplication key.
    pub code: String,
}

impl CoinbaseSubscription {
    /// Creates the record for a user's first confirmed charge.
    pub fn start(user_id: UserId, code: impl Into<String>, now: Timestamp) -> Self {
        Self {
            user_id,
            end_at: now.add_years(YEARS_PER_CHARGE),
            code: code.into(),
        }
    }

    pub fn state(&self, now: Timestamp) -> CoinbaseState {
        if self.end_at.is_after(&now) {
            CoinbaseState::Active
        } else {
            CoinbaseState::Expired
        }
    }

    pub fn is_active(&self, now: Timestamp) -> bool {
        self.state(now) == CoinbaseState::Active
    }

    /// Applies another confirmed charge.
    ///
    /// An active record is extended from its current `end_at`; an expired
    /// one restarts from `now`, so `end_at` never decreases.
    pub fn apply_charge(&mut self, code: &str, now: Timestamp) -> ChargeApplied {
        let previous_state = self.state(now);

        let replaced_code = if self.code != code {
            Some(std::mem::replace(&mut self.code, code.to_string()))
        } else {
            None
        };

        self.end_at = match previous_state {
            CoinbaseState::Active => self.end_at.add_years(YEARS_PER_CHARGE),
            CoinbaseState::Expired => now.add_years(YEARS_PER_CHARGE),
        };

        ChargeApplied {
            previous_state,
            replaced_code,
        }
    }
}
