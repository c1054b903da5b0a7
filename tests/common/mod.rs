//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use secrecy::Secret;
use sha1::{Digest, Sha1};

use alias_billing::adapters::in_memory::{
    InMemorySubscriptionLedger, InMemoryUserDirectory, RecordingNotificationSink,
};
use alias_billing::application::{
    HandleCoinbaseWebhookHandler, HandlePaddleWebhookHandler, IssueCouponHandler,
    ReconciliationEngine,
};
use alias_billing::domain::billing::{
    php_serialize, sign_payload, CoinbaseSignatureVerifier, FormFields, NotificationComposer,
    PaddleEventParser, PaddleSignatureVerifier, PlanCatalog, SIGNATURE_FIELD,
};
use alias_billing::domain::foundation::Timestamp;

pub const PADDLE_PRIVATE_KEY: &str = include_str!("../fixtures/paddle_test_private_key.pem");
pub const PADDLE_PUBLIC_KEY: &str = include_str!("../fixtures/paddle_test_public_key.pem");
pub const COINBASE_SECRET: &str = "whsec_integration";

pub const MONTHLY_PLAN: &str = "1000";
pub const YEARLY_PLAN: &str = "2000";
pub const COUPON_PRODUCT: &str = "3000";

pub const KNOWN_USER: i64 = 88;
pub const KNOWN_EMAIL: &str = "u88@example.com";

/// Base64 `p_signature` for `pairs`.
pub fn paddle_signature(pairs: &[(&str, &str)]) -> String {
    let fields: FormFields = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let key = RsaPrivateKey::from_pkcs8_pem(PADDLE_PRIVATE_KEY).unwrap();
    let digest = Sha1::digest(php_serialize(&fields).as_bytes());
    BASE64.encode(key.sign(Pkcs1v15Sign::new::<Sha1>(), &digest).unwrap())
}

/// Form body for `pairs` signed with the fixture key.
pub fn signed_paddle_body(pairs: &[(&str, &str)]) -> Vec<u8> {
    let signature = paddle_signature(pairs);
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().copied())
        .append_pair(SIGNATURE_FIELD, &signature)
        .finish()
        .into_bytes()
}

pub fn coinbase_signature(body: &str) -> String {
    sign_payload(COINBASE_SECRET, body.as_bytes())
}

pub fn at(rfc3339: &str) -> Timestamp {
    Timestamp::from_datetime(
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc),
    )
}

/// Handlers wired to in-memory adapters.
pub struct Harness {
    pub ledger: Arc<InMemorySubscriptionLedger>,
    pub notifier: Arc<RecordingNotificationSink>,
    pub paddle: HandlePaddleWebhookHandler,
    pub coupons: IssueCouponHandler,
    pub coinbase: HandleCoinbaseWebhookHandler,
}

impl Harness {
    pub fn new() -> Self {
        let ledger = Arc::new(InMemorySubscriptionLedger::new());
        let notifier = Arc::new(RecordingNotificationSink::new());
        let engine = Arc::new(ReconciliationEngine::new(
            ledger.clone(),
            Arc::new(InMemoryUserDirectory::new().with_user(KNOWN_USER, KNOWN_EMAIL)),
            notifier.clone(),
            NotificationComposer::new("Alias Relay"),
        ));

        let paddle_verifier = Arc::new(PaddleSignatureVerifier::from_pem(PADDLE_PUBLIC_KEY).unwrap());
        let parser = Arc::new(PaddleEventParser::new(PlanCatalog::new(
            vec![MONTHLY_PLAN.parse().unwrap()],
            vec![YEARLY_PLAN.parse().unwrap()],
            MONTHLY_PLAN.parse().unwrap(),
            COUPON_PRODUCT,
        )));
        let coinbase_verifier = Arc::new(CoinbaseSignatureVerifier::new(Secret::new(
            COINBASE_SECRET.to_string(),
        )));

        Self {
            paddle: HandlePaddleWebhookHandler::new(
                paddle_verifier.clone(),
                parser.clone(),
                engine.clone(),
            ),
            coupons: IssueCouponHandler::new(paddle_verifier, parser, engine.clone()),
            coinbase: HandleCoinbaseWebhookHandler::new(coinbase_verifier, engine),
            ledger,
            notifier,
        }
    }
}
