//! IssueCouponHandler - fulfills purchases of the one-year coupon product.

use std::sync::Arc;

use crate::domain::billing::{
    Coupon, InboundWebhook, PaddleEventParser, PaddleSignatureVerifier, SignatureVerifier,
    WebhookError,
};
use crate::domain::foundation::RequestContext;

use super::{log_failure, Reconciliation, ReconciliationEngine};

/// Command to handle a `/paddle_coupon` fulfillment callback.
#[derive(Debug, Clone)]
pub struct IssueCouponCommand {
    /// Raw form-encoded body, `p_signature` included.
    pub body: Vec<u8>,
}

pub struct IssueCouponHandler {
    verifier: Arc<PaddleSignatureVerifier>,
    parser: Arc<PaddleEventParser>,
    engine: Arc<ReconciliationEngine>,
}

impl IssueCouponHandler {
    pub fn new(
        verifier: Arc<PaddleSignatureVerifier>,
        parser: Arc<PaddleEventParser>,
        engine: Arc<ReconciliationEngine>,
    ) -> Self {
        Self {
            verifier,
            parser,
            engine,
        }
    }

    /// Returns the issued coupon so it can be shown to the buyer.
    pub async fn handle(
        &self,
        ctx: &RequestContext,
        cmd: IssueCouponCommand,
    ) -> Result<Coupon, WebhookError> {
        let fields = self
            .verifier
            .verify(&InboundWebhook::self_signed(&cmd.body))
            .map_err(|e| log_failure(ctx, "verify", e, &cmd.body))?;

        let event = self
            .parser
            .parse_coupon_request(ctx, &fields)
            .map_err(|e| log_failure(ctx, "parse", e, &cmd.body))?;

        match self.engine.apply(ctx, event.into()).await {
            Ok(Reconciliation::CouponIssued(coupon)) => Ok(coupon),
            Ok(other) => Err(log_failure(
                ctx,
                "apply",
                WebhookError::Internal(format!("unexpected outcome: {:?}", other)),
                &cmd.body,
            )),
            Err(e) => Err(log_failure(ctx, "apply", e, &cmd.body)),
        }
    }
}
