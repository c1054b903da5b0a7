//! Common shape of provider signature verification.

use std::collections::BTreeMap;

use subtle::ConstantTimeEq;

use super::WebhookError;

/// Decoded form fields, ordered by key.
pub type FormFields = BTreeMap<String, String>;

/// The untouched bytes of an inbound webhook plus its signature header.
#[derive(Debug, Clone, Copy)]
pub struct InboundWebhook<'a> {
    /// Raw request body exactly as received.
    pub body: &'a [u8],
    /// Signature header value, for providers that sign out of band.
    pub signature: Option<&'a str>,
}

impl<'a> InboundWebhook<'a> {
    pub fn new(body: &'a [u8], signature: Option<&'a str>) -> Self {
        Self { body, signature }
    }

    /// A body that carries its own signature (form-encoded providers).
    pub fn self_signed(body: &'a [u8]) -> Self {
        Self {
            body,
            signature: None,
        }
    }
}

/// Authenticates inbound webhooks for one provider.
///
/// On success returns the decoded payload so the body is parsed exactly once.
/// Implementations have no side effects.
pub trait SignatureVerifier: Send + Sync {
    /// Decoded payload handed to the event parser.
    type Payload;

    /// Verifies the request and decodes its body.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` if the signature is missing or does not match
    /// - `MalformedPayload` if the body cannot be decoded
    fn verify(&self, request: &InboundWebhook<'_>) -> Result<Self::Payload, WebhookError>;

    /// True unless the signature check itself fails.
    fn is_authentic(&self, request: &InboundWebhook<'_>) -> bool {
        !matches!(self.verify(request), Err(WebhookError::InvalidSignature))
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the expected signature.
pub(crate) fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_compare_equal_values() {
        assert!(constant_time_compare(&[1, 2, 3, 4, 5], &[1, 2, 3, 4, 5]));
    }

    #[test]
    fn constant_time_compare_different_values() {
        assert!(!constant_time_compare(&[1, 2, 3, 4, 5], &[1, 2, 3, 4, 6]));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
    }

    #[test]
    fn constant_time_compare_empty_slices() {
        assert!(constant_time_compare(&[], &[]));
    }

    struct AlwaysMalformed;

    impl SignatureVerifier for AlwaysMalformed {
        type Payload = ();

        fn verify(&self, _request: &InboundWebhook<'_>) -> Result<(), WebhookError> {
            Err(WebhookError::MalformedPayload("nope".to_string()))
        }
    }

    #[test]
    fn is_authentic_only_fails_on_signature_errors() {
        let request = InboundWebhook::self_signed(b"");
        assert!(AlwaysMalformed.is_authentic(&request));
    }
}
