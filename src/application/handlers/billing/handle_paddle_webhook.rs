//! HandlePaddleWebhookHandler - processes Paddle subscription alerts.

use std::sync::Arc;

use crate::domain::billing::{
    InboundWebhook, PaddleEventParser, PaddleSignatureVerifier, SignatureVerifier, WebhookError,
};
use crate::domain::foundation::RequestContext;

use super::{log_failure, Reconciliation, ReconciliationEngine};

/// Command to handle a `/paddle` alert.
#[derive(Debug, Clone)]
pub struct HandlePaddleWebhookCommand {
    /// Raw form-encoded body, `p_signature` included.
    pub body: Vec<u8>,
}

/// Verifies, parses and applies Paddle alerts.
pub struct HandlePaddleWebhookHandler {
    verifier: Arc<PaddleSignatureVerifier>,
    parser: Arc<PaddleEventParser>,
    engine: Arc<ReconciliationEngine>,
}

impl HandlePaddleWebhookHandler {
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

    pub async fn handle(
        &self,
        ctx: &RequestContext,
        cmd: HandlePaddleWebhookCommand,
    ) -> Result<Reconciliation, WebhookError> {
        // 1. Authenticate before anything else
        let fields = self
            .verifier
            .verify(&InboundWebhook::self_signed(&cmd.body))
            .map_err(|e| log_failure(ctx, "verify", e, &cmd.body))?;

        // 2. Normalize
        let event = self
            .parser
            .parse_alert(ctx, &fields)
            .map_err(|e| log_failure(ctx, "parse", e, &cmd.body))?;

        tracing::info!(request_id = %ctx.request_id, kind = event.kind(), "Paddle alert received");

        // 3. Apply
        self.engine
            .apply(ctx, event.into())
            .await
            .map_err(|e| log_failure(ctx, "apply", e, &cmd.body))
    }
}
