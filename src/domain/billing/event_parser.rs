//! Turns verified provider payloads into canonical events.
//!
//! Every field a transition needs is extracted and typed here. Anything
//! missing or unparsable is rejected before the ledger is touched.

use chrono::NaiveDate;
use serde_json::Value;

use super::events::{CoinbaseEvent, PaddleEvent, SubscriptionTerms};
use super::signature::FormFields;
use super::{Plan, PlanCatalog, WebhookError};
use crate::domain::foundation::{RequestContext, UserId};

/// Paddle sends calendar dates as `YYYY-MM-DD`.
const PADDLE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Coinbase event type that credits a user.
pub const CHARGE_CONFIRMED: &str = "charge:confirmed";

/// Parser for Paddle form alerts.
#[derive(Debug, Clone)]
pub struct PaddleEventParser {
    catalog: PlanCatalog,
}

impl PaddleEventParser {
    pub fn new(catalog: PlanCatalog) -> Self {
        Self { catalog }
    }

    /// Parses a `/paddle` alert by its `alert_name`.
    ///
    /// Unknown alert names parse to [`PaddleEvent::Unhandled`].
    ///
    /// # Errors
    ///
    /// - `MissingField` when a required field is absent or empty
    /// - `MalformedEvent` when a field cannot be parsed
    /// - `UnknownProductId` when a created subscription's plan id is not configured
    pub fn parse_alert(
        &self,
        ctx: &RequestContext,
        fields: &FormFields,
    ) -> Result<PaddleEvent, WebhookError> {
        let alert_name = required(fields, "alert_name")?;
        tracing::debug!(request_id = %ctx.request_id, alert_name, "Parsing Paddle alert");

        let event = match alert_name {
            "subscription_created" => {
                let user_id = passthrough_user_id(required(fields, "passthrough")?)?;
                let plan = self.catalog.resolve(plan_id(fields)?)?;
                PaddleEvent::SubscriptionCreated {
                    user_id,
                    subscription_id: required(fields, "subscription_id")?.to_string(),
                    terms: terms(fields, plan)?,
                }
            }
            "subscription_payment_succeeded" => PaddleEvent::PaymentSucceeded {
                subscription_id: required(fields, "subscription_id")?.to_string(),
                next_bill_date: date(fields, "next_bill_date")?,
            },
            "subscription_cancelled" => PaddleEvent::Cancelled {
                subscription_id: required(fields, "subscription_id")?.to_string(),
                cancellation_effective_date: optional(fields, "cancellation_effective_date"),
            },
            "subscription_updated" => {
                let plan = self.catalog.resolve_for_update(plan_id(fields)?);
                PaddleEvent::Updated {
                    subscription_id: required(fields, "subscription_id")?.to_string(),
                    terms: terms(fields, plan)?,
                }
            }
            "payment_refunded" => PaddleEvent::Refunded {
                subscription_id: required(fields, "subscription_id")?.to_string(),
            },
            other => PaddleEvent::Unhandled {
                alert_name: other.to_string(),
            },
        };

        Ok(event)
    }

    /// Parses a `/paddle_coupon` fulfillment callback.
    ///
    /// # Errors
    ///
    /// `UnknownProductId` unless `p_product_id` is the coupon product.
    pub fn parse_coupon_request(
        &self,
        ctx: &RequestContext,
        fields: &FormFields,
    ) -> Result<PaddleEvent, WebhookError> {
        let product_id = fields.get("p_product_id").map(String::as_str).unwrap_or("");
        tracing::debug!(request_id = %ctx.request_id, product_id, "Parsing Paddle coupon request");

        if !self.catalog.is_coupon_product(product_id) {
            return Err(WebhookError::UnknownProductId(product_id.to_string()));
        }

        Ok(PaddleEvent::CouponRequested {
            product_id: product_id.to_string(),
            email: fields.get("email").filter(|e| !e.is_empty()).cloned(),
        })
    }
}

/// Parser for Coinbase Commerce JSON events.
#[derive(Debug, Clone, Default)]
pub struct CoinbaseEventParser;

impl CoinbaseEventParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses a verified Coinbase body.
    ///
    /// Accepts the delivery envelope (`{"id": .., "event": {..}}`) as well as
    /// a bare event object. Only `charge:confirmed` carries data; other types
    /// parse to [`CoinbaseEvent::NoOp`].
    pub fn parse(&self, ctx: &RequestContext, body: &Value) -> Result<CoinbaseEvent, WebhookError> {
        let event = match body.get("event") {
            Some(inner) if inner.is_object() => inner,
            _ => body,
        };

        let event_type = event
            .get("type")
            .and_then(Value::as_str)
            .ok_or(WebhookError::MissingField("type"))?;
        tracing::debug!(request_id = %ctx.request_id, event_type, "Parsing Coinbase event");

        if event_type != CHARGE_CONFIRMED {
            return Ok(CoinbaseEvent::NoOp {
                event_type: event_type.to_string(),
            });
        }

        let data = event.get("data").ok_or(WebhookError::MissingField("data"))?;

        let user_id = data
            .pointer("/metadata/user_id")
            .ok_or(WebhookError::MissingField("data.metadata.user_id"))
            .and_then(json_user_id)?;

        let code = data
            .get("code")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .ok_or(WebhookError::MissingField("data.code"))?;

        Ok(CoinbaseEvent::ChargeConfirmed {
            user_id,
            code: code.to_string(),
        })
    }
}

fn required<'a>(fields: &'a FormFields, name: &'static str) -> Result<&'a str, WebhookError> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(WebhookError::MissingField(name))
}

fn plan_id(fields: &FormFields) -> Result<i64, WebhookError> {
    let raw = required(fields, "subscription_plan_id")?;
    raw.parse().map_err(|_| {
        WebhookError::MalformedEvent(format!("subscription_plan_id is not an integer: {}", raw))
    })
}

fn date(fields: &FormFields, name: &'static str) -> Result<NaiveDate, WebhookError> {
    parse_date(name, required(fields, name)?)
}

fn optional(fields: &FormFields, name: &str) -> Option<String> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_date(name: &str, raw: &str) -> Result<NaiveDate, WebhookError> {
    NaiveDate::parse_from_str(raw, PADDLE_DATE_FORMAT)
        .map_err(|_| WebhookError::MalformedEvent(format!("{} is not a YYYY-MM-DD date: {}", name, raw)))
}

fn terms(fields: &FormFields, plan: Plan) -> Result<SubscriptionTerms, WebhookError> {
    Ok(SubscriptionTerms {
        plan,
        cancel_url: required(fields, "cancel_url")?.to_string(),
        update_url: required(fields, "update_url")?.to_string(),
        next_bill_date: date(fields, "next_bill_date")?,
    })
}

/// Extracts `user_id` from the JSON passthrough, e.g. `{"user_id": 88}`.
fn passthrough_user_id(raw: &str) -> Result<UserId, WebhookError> {
    let passthrough: Value = serde_json::from_str(raw)
        .map_err(|e| WebhookError::MalformedEvent(format!("passthrough is not JSON: {}", e)))?;

    passthrough
        .get("user_id")
        .ok_or_else(|| WebhookError::MalformedEvent("passthrough has no user_id".to_string()))
        .and_then(json_user_id)
}

/// Accepts a user id as a JSON integer or a numeric string.
fn json_user_id(value: &Value) -> Result<UserId, WebhookError> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    id.map(UserId::new)
        .ok_or_else(|| WebhookError::MalformedEvent(format!("invalid user_id: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::Plan;
    use crate::domain::foundation::Provider;
    use serde_json::json;

    fn parser() -> PaddleEventParser {
        PaddleEventParser::new(PlanCatalog::new(vec![1000, 1001], vec![2000], 1001, "3000"))
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Provider::Paddle)
    }

    fn form(pairs: &[(&str, &str)]) -> FormFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn created(plan_id: &str, passthrough: &str) -> FormFields {
        form(&[
            ("alert_name", "subscription_created"),
            ("passthrough", passthrough),
            ("subscription_plan_id", plan_id),
            ("subscription_id", "sub_1"),
            ("cancel_url", "https://pay.example/cancel"),
            ("update_url", "https://pay.example/update"),
            ("next_bill_date", "2024-02-01"),
        ])
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Paddle Alert Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_subscription_created() {
        let event = parser()
            .parse_alert(&ctx(), &created("1000", "{\"user_id\": 88 }"))
            .unwrap();

        assert_eq!(
            event,
            PaddleEvent::SubscriptionCreated {
                user_id: UserId::new(88),
                subscription_id: "sub_1".to_string(),
                terms: SubscriptionTerms {
                    plan: Plan::Monthly,
                    cancel_url: "https://pay.example/cancel".to_string(),
                    update_url: "https://pay.example/update".to_string(),
                    next_bill_date: ymd(2024, 2, 1),
                },
            }
        );
    }

    #[test]
    fn passthrough_user_id_may_be_a_string() {
        let event = parser()
            .parse_alert(&ctx(), &created("2000", "{\"user_id\": \"88\"}"))
            .unwrap();
        assert!(matches!(
            event,
            PaddleEvent::SubscriptionCreated { user_id, terms, .. }
                if user_id == UserId::new(88) && terms.plan == Plan::Yearly
        ));
    }

    #[test]
    fn created_with_unknown_plan_is_rejected() {
        let err = parser()
            .parse_alert(&ctx(), &created("42", "{\"user_id\": 88}"))
            .unwrap_err();
        assert!(matches!(err, WebhookError::UnknownProductId(id) if id == "42"));
    }

    #[test]
    fn created_without_passthrough_is_missing_field() {
        let mut fields = created("1000", "{}");
        fields.remove("passthrough");
        let err = parser().parse_alert(&ctx(), &fields).unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("passthrough")));
    }

    #[test]
    fn passthrough_without_user_id_is_malformed() {
        let err = parser()
            .parse_alert(&ctx(), &created("1000", "{\"account\": 1}"))
            .unwrap_err();
        assert!(matches!(err, WebhookError::MalformedEvent(_)));
    }

    #[test]
    fn passthrough_that_is_not_json_is_malformed() {
        let err = parser()
            .parse_alert(&ctx(), &created("1000", "user=88"))
            .unwrap_err();
        assert!(matches!(err, WebhookError::MalformedEvent(_)));
    }

    #[test]
    fn non_numeric_plan_id_is_malformed() {
        let err = parser()
            .parse_alert(&ctx(), &created("monthly", "{\"user_id\": 1}"))
            .unwrap_err();
        assert!(matches!(err, WebhookError::MalformedEvent(_)));
    }

    #[test]
    fn bad_next_bill_date_is_malformed() {
        let mut fields = created("1000", "{\"user_id\": 1}");
        fields.insert("next_bill_date".to_string(), "01/02/2024".to_string());
        let err = parser().parse_alert(&ctx(), &fields).unwrap_err();
        assert!(matches!(err, WebhookError::MalformedEvent(_)));
    }

    #[test]
    fn parses_payment_succeeded() {
        let fields = form(&[
            ("alert_name", "subscription_payment_succeeded"),
            ("subscription_id", "sub_1"),
            ("next_bill_date", "2024-03-01"),
        ]);
        assert_eq!(
            parser().parse_alert(&ctx(), &fields).unwrap(),
            PaddleEvent::PaymentSucceeded {
                subscription_id: "sub_1".to_string(),
                next_bill_date: ymd(2024, 3, 1),
            }
        );
    }

    #[test]
    fn parses_cancelled_with_and_without_effective_date() {
        let with_date = form(&[
            ("alert_name", "subscription_cancelled"),
            ("subscription_id", "sub_1"),
            ("cancellation_effective_date", "2024-03-01"),
        ]);
        assert_eq!(
            parser().parse_alert(&ctx(), &with_date).unwrap(),
            PaddleEvent::Cancelled {
                subscription_id: "sub_1".to_string(),
                cancellation_effective_date: Some("2024-03-01".to_string()),
            }
        );

        let without = form(&[
            ("alert_name", "subscription_cancelled"),
            ("subscription_id", "sub_1"),
        ]);
        assert!(matches!(
            parser().parse_alert(&ctx(), &without).unwrap(),
            PaddleEvent::Cancelled { cancellation_effective_date: None, .. }
        ));
    }

    #[test]
    fn cancelled_keeps_effective_date_in_any_format() {
        let fields = form(&[
            ("alert_name", "subscription_cancelled"),
            ("subscription_id", "sub_1"),
            ("cancellation_effective_date", "2024-02-01 00:00:00"),
        ]);
        assert_eq!(
            parser().parse_alert(&ctx(), &fields).unwrap(),
            PaddleEvent::Cancelled {
                subscription_id: "sub_1".to_string(),
                cancellation_effective_date: Some("2024-02-01 00:00:00".to_string()),
            }
        );
    }

    #[test]
    fn updated_uses_narrow_plan_resolution() {
        let fields = form(&[
            ("alert_name", "subscription_updated"),
            ("subscription_id", "sub_1"),
            ("subscription_plan_id", "1000"),
            ("cancel_url", "c"),
            ("update_url", "u"),
            ("next_bill_date", "2024-03-01"),
        ]);

        let event = parser().parse_alert(&ctx(), &fields).unwrap();

        // 1000 is a monthly id, but not the current one.
        assert!(matches!(
            event,
            PaddleEvent::Updated { terms, .. } if terms.plan == Plan::Yearly
        ));
    }

    #[test]
    fn updated_with_unknown_plan_id_is_not_rejected() {
        let fields = form(&[
            ("alert_name", "subscription_updated"),
            ("subscription_id", "sub_1"),
            ("subscription_plan_id", "42"),
            ("cancel_url", "c"),
            ("update_url", "u"),
            ("next_bill_date", "2024-03-01"),
        ]);
        assert!(parser().parse_alert(&ctx(), &fields).is_ok());
    }

    #[test]
    fn parses_refund() {
        let fields = form(&[("alert_name", "payment_refunded"), ("subscription_id", "sub_9")]);
        assert_eq!(
            parser().parse_alert(&ctx(), &fields).unwrap(),
            PaddleEvent::Refunded {
                subscription_id: "sub_9".to_string()
            }
        );
    }

    #[test]
    fn unknown_alert_is_unhandled() {
        let fields = form(&[("alert_name", "high_risk_transaction_created")]);
        assert_eq!(
            parser().parse_alert(&ctx(), &fields).unwrap(),
            PaddleEvent::Unhandled {
                alert_name: "high_risk_transaction_created".to_string()
            }
        );
    }

    #[test]
    fn missing_alert_name_is_rejected() {
        let err = parser().parse_alert(&ctx(), &form(&[])).unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("alert_name")));
    }

    // ══════════════════════════════════════════════════════════════
    // Paddle Coupon Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn coupon_request_for_coupon_product() {
        let fields = form(&[("p_product_id", "3000"), ("email", "buyer@example.com")]);
        assert_eq!(
            parser().parse_coupon_request(&ctx(), &fields).unwrap(),
            PaddleEvent::CouponRequested {
                product_id: "3000".to_string(),
                email: Some("buyer@example.com".to_string()),
            }
        );
    }

    #[test]
    fn coupon_request_for_other_product_is_rejected() {
        let fields = form(&[("p_product_id", "1000")]);
        let err = parser().parse_coupon_request(&ctx(), &fields).unwrap_err();
        assert!(matches!(err, WebhookError::UnknownProductId(_)));
    }

    #[test]
    fn coupon_request_without_product_is_rejected() {
        let err = parser()
            .parse_coupon_request(&ctx(), &form(&[("email", "a@b.c")]))
            .unwrap_err();
        assert!(matches!(err, WebhookError::UnknownProductId(_)));
    }

    // ══════════════════════════════════════════════════════════════
    // Coinbase Tests
    // ══════════════════════════════════════════════════════════════

    fn coinbase_ctx() -> RequestContext {
        RequestContext::new(Provider::Coinbase)
    }

    #[test]
    fn parses_confirmed_charge_in_envelope() {
        let body = json!({
            "id": "evt_1",
            "event": {
                "type": "charge:confirmed",
                "data": { "code": "abc", "metadata": { "user_id": "42" } }
            }
        });

        assert_eq!(
            CoinbaseEventParser::new().parse(&coinbase_ctx(), &body).unwrap(),
            CoinbaseEvent::ChargeConfirmed {
                user_id: UserId::new(42),
                code: "abc".to_string(),
            }
        );
    }

    #[test]
    fn parses_bare_event_with_numeric_user_id() {
        let body = json!({
            "type": "charge:confirmed",
            "data": { "code": "xyz", "metadata": { "user_id": 7 } }
        });

        assert_eq!(
            CoinbaseEventParser::new().parse(&coinbase_ctx(), &body).unwrap(),
            CoinbaseEvent::ChargeConfirmed {
                user_id: UserId::new(7),
                code: "xyz".to_string(),
            }
        );
    }

    #[test]
    fn other_event_types_are_noop() {
        let body = json!({ "event": { "type": "charge:pending", "data": {} } });
        assert_eq!(
            CoinbaseEventParser::new().parse(&coinbase_ctx(), &body).unwrap(),
            CoinbaseEvent::NoOp {
                event_type: "charge:pending".to_string()
            }
        );
    }

    #[test]
    fn missing_type_is_rejected() {
        let err = CoinbaseEventParser::new()
            .parse(&coinbase_ctx(), &json!({ "data": {} }))
            .unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("type")));
    }

    #[test]
    fn confirmed_charge_without_user_is_rejected() {
        let body = json!({ "type": "charge:confirmed", "data": { "code": "abc", "metadata": {} } });
        let err = CoinbaseEventParser::new().parse(&coinbase_ctx(), &body).unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("data.metadata.user_id")));
    }

    #[test]
    fn confirmed_charge_with_non_numeric_user_is_malformed() {
        let body = json!({
            "type": "charge:confirmed",
            "data": { "code": "abc", "metadata": { "user_id": "alice" } }
        });
        let err = CoinbaseEventParser::new().parse(&coinbase_ctx(), &body).unwrap_err();
        assert!(matches!(err, WebhookError::MalformedEvent(_)));
    }

    #[test]
    fn confirmed_charge_without_code_is_rejected() {
        let body = json!({ "type": "charge:confirmed", "data": { "metadata": { "user_id": 1 } } });
        let err = CoinbaseEventParser::new().parse(&coinbase_ctx(), &body).unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("data.code")));
    }
}
