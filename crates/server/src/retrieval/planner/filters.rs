//! Deterministic structured-filter generation.
//!
//! Independent of the model: every populated vocabulary slot becomes an `in`
//! filter and price constraints become numeric bounds on the price field for
//! their billing period.

use toolscout_core::{
    BillingPeriod, FilterOperator, IntentState, PriceComparison, PriceOperator, PriceRange, Slot,
    StructuredFilter, sanitize_price,
};

/// Lower and upper multipliers for an `around` comparison.
pub const AROUND_LOWER: f64 = 0.9;
pub const AROUND_UPPER: f64 = 1.1;

/// Slots that become filters, in emission order.
const FILTER_SLOTS: [Slot; 6] = [
    Slot::Category,
    Slot::Interface,
    Slot::Deployment,
    Slot::Functionality,
    Slot::PricingModel,
    Slot::UserType,
];

/// Filters for every populated slot and any price constraint.
#[must_use]
pub fn structured_filters(intent: &IntentState) -> Vec<StructuredFilter> {
    let mut filters: Vec<StructuredFilter> = FILTER_SLOTS
        .iter()
        .filter_map(|slot| slot_filter(intent, *slot))
        .collect();

    if let Some(range) = intent.price_range() {
        filters.extend(range_filters(range));
    } else if let Some(comparison) = intent.price_comparison() {
        filters.extend(comparison_filters(comparison));
    }
    filters
}

/// An `in` filter over the slot's vocabulary-valid values, if any remain.
#[must_use]
pub fn slot_filter(intent: &IntentState, slot: Slot) -> Option<StructuredFilter> {
    let values = slot.retain_valid(intent.slot(slot)?);
    (!values.is_empty()).then(|| StructuredFilter::one_of(slot.field(), values))
}

/// `gte min` / `lte max`, either bound optional.
#[must_use]
pub fn range_filters(range: &PriceRange) -> Vec<StructuredFilter> {
    let field = BillingPeriod::price_field(range.billing_period);
    [
        (FilterOperator::Gte, range.min),
        (FilterOperator::Lte, range.max),
    ]
    .into_iter()
    .filter_map(|(operator, bound)| {
        bound
            .and_then(sanitize_price)
            .map(|value| StructuredFilter::numeric(field, operator, value))
    })
    .collect()
}

/// Bounds for a single-sided or approximate comparison.
///
/// A comparison without an amount ("cheaper") produces no filter.
#[must_use]
pub fn comparison_filters(comparison: &PriceComparison) -> Vec<StructuredFilter> {
    let field = BillingPeriod::price_field(comparison.billing_period);
    let Some(value) = comparison.value.and_then(sanitize_price) else {
        return Vec::new();
    };

    match comparison.operator {
        PriceOperator::LessThan => vec![StructuredFilter::numeric(field, FilterOperator::Lt, value)],
        PriceOperator::GreaterThan => {
            vec![StructuredFilter::numeric(field, FilterOperator::Gt, value)]
        }
        PriceOperator::EqualTo => vec![StructuredFilter::numeric(field, FilterOperator::Eq, value)],
        PriceOperator::Around => vec![
            StructuredFilter::numeric(field, FilterOperator::Gte, value * AROUND_LOWER),
            StructuredFilter::numeric(field, FilterOperator::Lte, value * AROUND_UPPER),
        ],
    }
}
