//! Request-scoped context threaded through parsing and reconciliation.

use std::fmt;

use uuid::Uuid;

use super::Timestamp;

/// Payment provider that originated an inbound webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Paddle recurring billing (form-encoded, RSA-signed).
    Paddle,
    /// Coinbase Commerce one-off charges (JSON, HMAC-signed).
    Coinbase,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Paddle => "paddle",
            Provider::Coinbase => "coinbase",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a single webhook delivery needs to know about itself.
///
/// `received_at` is the only clock reading used while handling the request:
/// every `event_time`, `end_at` and expiry computed for this delivery derives
/// from it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub provider: Provider,
    pub received_at: Timestamp,
}

impl RequestContext {
    /// Creates a context for a delivery received now.
    pub fn new(provider: Provider) -> Self {
        Self::at(provider, Timestamp::now())
    }

    /// Creates a context pinned to a specific receipt time.
    pub fn at(provider: Provider, received_at: Timestamp) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            provider,
            received_at,
        }
    }

    /// The request's notion of "now".
    pub fn now(&self) -> Timestamp {
        self.received_at
    }
}
