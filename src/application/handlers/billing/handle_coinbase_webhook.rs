//! HandleCoinbaseWebhookHandler - processes Coinbase Commerce events.

use std::sync::Arc;

use crate::domain::billing::{
    CoinbaseEventParser, CoinbaseSignatureVerifier, InboundWebhook, SignatureVerifier,
    WebhookError,
};
use crate::domain::foundation::RequestContext;

use super::{log_failure, Reconciliation, ReconciliationEngine};

/// Command to handle a `/coinbase` event.
#[derive(Debug, Clone)]
pub struct HandleCoinbaseWebhookCommand {
    /// Raw JSON body.
    pub body: Vec<u8>,
    /// `X-CC-Webhook-Signature` header, if sent.
    pub signature: Option<String>,
}

pub struct HandleCoinbaseWebhookHandler {
    verifier: Arc<CoinbaseSignatureVerifier>,
    parser: CoinbaseEventParser,
    engine: Arc<ReconciliationEngine>,
}

impl HandleCoinbaseWebhookHandler {
    pub fn new(verifier: Arc<CoinbaseSignatureVerifier>, engine: Arc<ReconciliationEngine>) -> Self {
        Self {
            verifier,
            parser: CoinbaseEventParser::new(),
            engine,
        }
    }

    pub async fn handle(
        &self,
        ctx: &RequestContext,
        cmd: HandleCoinbaseWebhookCommand,
    ) -> Result<Reconciliation, WebhookError> {
        let request = InboundWebhook::new(&cmd.body, cmd.signature.as_deref());

        let body = self
            .verifier
            .verify(&request)
            .map_err(|e| log_failure(ctx, "verify", e, &cmd.body))?;

        let event = self
            .parser
            .parse(ctx, &body)
            .map_err(|e| log_failure(ctx, "parse", e, &cmd.body))?;

        tracing::info!(request_id = %ctx.request_id, kind = event.kind(), "Coinbase event received");

        self.engine
            .apply(ctx, event.into())
            .await
            .map_err(|e| log_failure(ctx, "apply", e, &cmd.body))
    }
}
