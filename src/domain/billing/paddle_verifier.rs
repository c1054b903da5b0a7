//! Paddle webhook signature verification.
//!
//! Paddle (classic) signs form-encoded alerts with RSA-SHA1:
//!
//! 1. Take every form field except `p_signature`
//! 2. Sort by key and PHP-`serialize` them as an array of strings
//! 3. Verify the base64 `p_signature` as a PKCS#1 v1.5 signature of the
//!    SHA-1 digest of that string, using the vendor public key

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};

use super::signature::{FormFields, InboundWebhook, SignatureVerifier};
use super::WebhookError;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Form field holding the base64 signature.
pub const SIGNATURE_FIELD: &str = "p_signature";

/// Decodes an `application/x-www-form-urlencoded` body.
///
/// When a key repeats, the first value wins.
pub fn decode_form(body: &[u8]) -> FormFields {
    let mut fields = FormFields::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        fields
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    fields
}

/// PHP `serialize()` of a string-to-string array, in key order.
///
/// Lengths are byte lengths, as PHP counts them.
pub fn php_serialize(fields: &FormFields) -> String {
    let mut out = format!("a:{}:{{", fields.len());
    for (key, value) in fields {
        out.push_str(&format!("s:{}:\"{}\";", key.len(), key));
        out.push_str(&format!("s:{}:\"{}\";", value.len(), value));
    }
    out.push('}');
    out
}

/// Verifier for Paddle alert signatures.
#[derive(Debug, Clone)]
pub struct PaddleSignatureVerifier {
    public_key: RsaPublicKey,
}

impl PaddleSignatureVerifier {
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self { public_key }
    }

    /// Loads the vendor public key from PEM (SPKI or PKCS#1).
    ///
    /// # Errors
    ///
    /// `ValidationFailed` if the PEM cannot be decoded as an RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self, DomainError> {
        let public_key = RsaPublicKey::from_public_key_pem(pem.trim())
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem.trim()))
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::ValidationFailed,
                    format!("Invalid Paddle public key: {}", e),
                )
            })?;
        Ok(Self::new(public_key))
    }

    /// Checks `signature` against the given (already stripped) fields.
    fn verify_fields(&self, fields: &FormFields, signature: &str) -> Result<(), WebhookError> {
        let signature = BASE64
            .decode(signature.trim())
            .map_err(|_| WebhookError::InvalidSignature)?;

        let digest = Sha1::digest(php_serialize(fields).as_bytes());

        self.public_key
            .verify(Pkcs1v15Sign::new::<Sha1>(), &digest, &signature)
            .map_err(|_| WebhookError::InvalidSignature)
    }
}

impl SignatureVerifier for PaddleSignatureVerifier {
    type Payload = FormFields;

    /// Returns the form fields with `p_signature` removed.
    fn verify(&self, request: &InboundWebhook<'_>) -> Result<FormFields, WebhookError> {
        let mut fields = decode_form(request.body);

        let signature = fields
            .remove(SIGNATURE_FIELD)
            .ok_or(WebhookError::InvalidSignature)?;

        self.verify_fields(&fields, &signature)?;

        Ok(fields)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn alert_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("alert_name", "subscription_created"),
            ("subscription_id", "12345"),
            ("passthrough", "{\"user_id\": 88}"),
            ("next_bill_date", "2024-02-01"),
        ]
    }

    // ══════════════════════════════════════════════════════════════
    // PHP Serialization Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn php_serialize_sorts_and_prefixes_lengths() {
        let mut fields = FormFields::new();
        fields.insert("b".to_string(), "two".to_string());
        fields.insert("a".to_string(), "1".to_string());

        assert_eq!(
            php_serialize(&fields),
            "a:2:{s:1:\"a\";s:1:\"1\";s:1:\"b\";s:3:\"two\";}"
        );
    }

    #[test]
    fn php_serialize_counts_bytes_not_chars() {
        let mut fields = FormFields::new();
        fields.insert("name".to_string(), "é".to_string());

        assert_eq!(php_serialize(&fields), "a:1:{s:4:\"name\";s:2:\"é\";}");
    }

    #[test]
    fn php_serialize_empty_array() {
        assert_eq!(php_serialize(&FormFields::new()), "a:0:{}");
    }

    // ══════════════════════════════════════════════════════════════
    // Form Decoding Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn decode_form_handles_escapes_and_plus() {
        let fields = decode_form(b"passthrough=%7B%22user_id%22%3A+88%7D&email=a%40b.c");
        assert_eq!(fields["passthrough"], "{\"user_id\": 88}");
        assert_eq!(fields["email"], "a@b.c");
    }

    #[test]
    fn decode_form_keeps_first_duplicate() {
        let fields = decode_form(b"a=1&a=2");
        assert_eq!(fields["a"], "1");
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_valid_signature_returns_fields_without_signature() {
        let body = signed_form_body(&alert_pairs());

        let fields = test_verifier()
            .verify(&InboundWebhook::self_signed(&body))
            .unwrap();

        assert_eq!(fields["alert_name"], "subscription_created");
        assert_eq!(fields["passthrough"], "{\"user_id\": 88}");
        assert!(!fields.contains_key(SIGNATURE_FIELD));
    }

    #[test]
    fn verify_missing_signature_fails() {
        let body = b"alert_name=subscription_created&subscription_id=1";

        let result = test_verifier().verify(&InboundWebhook::self_signed(body));

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_tampered_field_fails() {
        let body = String::from_utf8(signed_form_body(&alert_pairs())).unwrap();
        let tampered = body.replace("12345", "99999");

        let result = test_verifier().verify(&InboundWebhook::self_signed(tampered.as_bytes()));

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_added_field_fails() {
        let mut body = signed_form_body(&alert_pairs());
        body.extend_from_slice(b"&extra=1");

        let result = test_verifier().verify(&InboundWebhook::self_signed(&body));

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_with_other_key_fails() {
        let body = signed_form_body(&alert_pairs());
        let verifier = PaddleSignatureVerifier::from_pem(OTHER_PUBLIC_KEY).unwrap();

        let result = verifier.verify(&InboundWebhook::self_signed(&body));

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_non_base64_signature_fails() {
        let body = b"alert_name=x&p_signature=%%%not-base64";

        let verifier = test_verifier();
        let request = InboundWebhook::self_signed(body);

        assert!(matches!(
            verifier.verify(&request),
            Err(WebhookError::InvalidSignature)
        ));
        assert!(!verifier.is_authentic(&request));
    }

    #[test]
    fn from_pem_rejects_garbage() {
        let result = PaddleSignatureVerifier::from_pem("not a key");
        assert!(matches!(result, Err(e) if e.code == ErrorCode::ValidationFailed));
    }
}
