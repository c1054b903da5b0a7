//! Coinbase Commerce webhook signature verification.
//!
//! Coinbase signs the raw request body with HMAC-SHA256 using the shared
//! webhook secret and sends the lowercase hex digest in the
//! `X-CC-Webhook-Signature` header.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use sha2::Sha256;

use super::signature::{constant_time_compare, InboundWebhook, SignatureVerifier};
use super::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC of the body.
pub const SIGNATURE_HEADER: &str = "X-CC-Webhook-Signature";

/// Verifier for Coinbase Commerce webhook signatures.
#[derive(Clone)]
pub struct CoinbaseSignatureVerifier {
    secret: Secret<String>,
}

impl CoinbaseSignatureVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    fn compute_signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for CoinbaseSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinbaseSignatureVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl SignatureVerifier for CoinbaseSignatureVerifier {
    type Payload = Value;

    /// Checks the header against the raw body, then decodes the body as JSON.
    ///
    /// The body is never parsed before the signature has been checked.
    fn verify(&self, request: &InboundWebhook<'_>) -> Result<Value, WebhookError> {
        let header = request.signature.ok_or(WebhookError::InvalidSignature)?;

        let provided = hex::decode(header.trim()).map_err(|_| WebhookError::InvalidSignature)?;
        let expected = self.compute_signature(request.body);

        if !constant_time_compare(&expected, &provided) {
            return Err(WebhookError::InvalidSignature);
        }

        serde_json::from_slice(request.body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))
    }
}

/// Hex signature Coinbase would send for `payload` under `secret`.
///
/// Used to build signed requests in tests and local tooling.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
