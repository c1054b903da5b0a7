//! Subscription plans and the product-id catalog that resolves them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::WebhookError;

/// Billing period of a recurring subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Monthly,
    Yearly,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monthly" => Some(Plan::Monthly),
            "yearly" => Some(Plan::Yearly),
            _ => None,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static mapping from provider product ids to plans.
///
/// Paddle identifies plans by integer ids; several ids may map to the same
/// plan (price changes over time create new ids). The coupon product is a
/// one-off purchase and never resolves to a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCatalog {
    monthly_product_ids: Vec<i64>,
    yearly_product_ids: Vec<i64>,
    monthly_product_id: i64,
    coupon_product_id: String,
}

impl PlanCatalog {
    pub fn new(
        monthly_product_ids: Vec<i64>,
        yearly_product_ids: Vec<i64>,
        monthly_product_id: i64,
        coupon_product_id: impl Into<String>,
    ) -> Self {
        Self {
            monthly_product_ids,
            yearly_product_ids,
            monthly_product_id,
            coupon_product_id: coupon_product_id.into(),
        }
    }

    /// Resolves a plan id against the full monthly and yearly id sets.
    ///
    /// # Errors
    ///
    /// `UnknownProductId` when the id is in neither set.
    pub fn resolve(&self, plan_id: i64) -> Result<Plan, WebhookError> {
        if self.monthly_product_ids.contains(&plan_id) {
            Ok(Plan::Monthly)
        } else if self.yearly_product_ids.contains(&plan_id) {
            Ok(Plan::Yearly)
        } else {
            Err(WebhookError::UnknownProductId(plan_id.to_string()))
        }
    }

    /// Resolves the plan carried by a `subscription_updated` alert.
    ///
    /// Only the single current monthly id counts as monthly here; anything
    /// else (including older monthly ids) is treated as yearly. This is
    /// narrower than [`PlanCatalog::resolve`] and is kept as-is, see
    /// DESIGN.md.
    pub fn resolve_for_update(&self, plan_id: i64) -> Plan {
        if plan_id == self.monthly_product_id {
            Plan::Monthly
        } else {
            Plan::Yearly
        }
    }

    /// True when `product_id` is the one-year coupon product.
    pub fn is_coupon_product(&self, product_id: &str) -> bool {
        product_id == self.coupon_product_id
    }
}
