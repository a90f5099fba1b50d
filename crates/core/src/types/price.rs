//! Price constraints extracted from a query.
//!
//! Prices are plain `f64` amounts in the currency's standard unit (dollars,
//! not cents). Any amount that reaches a backend filter goes through
//! [`sanitize_price`] first.

use std::fmt;

use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Parse a currency from a code or symbol.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "USD" | "$" => Some(Self::USD),
            "EUR" | "€" => Some(Self::EUR),
            "GBP" | "£" => Some(Self::GBP),
            "CAD" => Some(Self::CAD),
            "AUD" => Some(Self::AUD),
            _ => None,
        }
    }
}

/// How often a price is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingPeriod {
    Monthly,
    Yearly,
    OneTime,
}

impl BillingPeriod {
    /// Document field holding prices for this billing period.
    #[must_use]
    pub const fn price_field(period: Option<Self>) -> &'static str {
        match period {
            None | Some(Self::Monthly) => "pricing.monthly",
            Some(Self::Yearly) => "pricing.yearly",
            Some(Self::OneTime) => "pricing.oneTime",
        }
    }

    /// Parse a billing period name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "monthly" | "month" => Some(Self::Monthly),
            "yearly" | "annual" | "annually" | "year" => Some(Self::Yearly),
            "onetime" | "lifetime" => Some(Self::OneTime),
            _ => None,
        }
    }
}

/// Comparison operator for a single price bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceOperator {
    LessThan,
    GreaterThan,
    EqualTo,
    Around,
}

impl PriceOperator {
    /// Parse an operator name (`less_than`, `lt`, `<`, ...).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "less_than" | "lessthan" | "lt" | "<" | "under" | "below" => Some(Self::LessThan),
            "greater_than" | "greaterthan" | "gt" | ">" | "over" | "above" => {
                Some(Self::GreaterThan)
            }
            "equal_to" | "equalto" | "eq" | "=" | "exactly" => Some(Self::EqualTo),
            "around" | "about" | "approximately" | "~" => Some(Self::Around),
            _ => None,
        }
    }
}

impl fmt::Display for PriceOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LessThan => "less_than",
            Self::GreaterThan => "greater_than",
            Self::EqualTo => "equal_to",
            Self::Around => "around",
        })
    }
}

/// A price range with optional bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<BillingPeriod>,
}

/// A single-sided (or approximate) price comparison.
///
/// `value` is `None` for relative comparisons such as "cheaper", which carry
/// a direction but no amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceComparison {
    pub operator: PriceOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<BillingPeriod>,
}

/// Clamp a price to be non-negative.
///
/// Returns `None` for NaN and infinite amounts, which cannot be expressed in
/// a backend filter.
#[must_use]
pub fn sanitize_price(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_price() {
        assert_eq!(sanitize_price(-5.0), Some(0.0));
        assert_eq!(sanitize_price(12.5), Some(12.5));
        assert_eq!(sanitize_price(f64::NAN), None);
        assert_eq!(sanitize_price(f64::INFINITY), None);
    }

    #[test]
    fn test_price_field_by_billing_period() {
        assert_eq!(BillingPeriod::price_field(None), "pricing.monthly");
        assert_eq!(
            BillingPeriod::price_field(Some(BillingPeriod::Yearly)),
            "pricing.yearly"
        );
    }

    #[test]
    fn test_price_operator_parse() {
        assert_eq!(PriceOperator::parse("less_than"), Some(PriceOperator::LessThan));
        assert_eq!(PriceOperator::parse(">"), Some(PriceOperator::GreaterThan));
        assert_eq!(PriceOperator::parse("between"), None);
    }

    #[test]
    fn test_price_comparison_serialization() {
        let cmp = PriceComparison {
            operator: PriceOperator::LessThan,
            value: Some(50.0),
            currency: CurrencyCode::USD,
            billing_period: Some(BillingPeriod::Monthly),
        };
        let json = serde_json::to_value(cmp).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "operator": "less_than",
                "value": 50.0,
                "currency": "USD",
                "billingPeriod": "Monthly"
            })
        );
    }
}
