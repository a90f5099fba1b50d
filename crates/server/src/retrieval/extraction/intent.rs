//! Intent extractor: runs the detectors and the structuring call, then
//! merges everything into one [`IntentState`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use toolscout_core::{
    BillingPeriod, ComparisonMode, CurrencyCode, Embedder, ExtractionSignals, FilterValue,
    IntentState, LanguageModel, PriceComparison, PriceOperator, PriceRange, PrimaryGoal,
    RawFilter, Slot, sanitize_price,
};
use tracing::{debug, instrument};

use super::name_resolver::ResolvedName;
use super::price::PriceSignal;
use super::{
    DetectorError, classifier, comparative, entities, fail_soft, fuzzy, interface,
    name_resolver, normalize_query, price, reference, semantic,
};
use crate::retrieval::catalog::{Catalog, CatalogCache};
use crate::retrieval::json_block;
use crate::retrieval::planner::advisor::validate_raw_filter;

/// Header of the structuring prompt.
pub const PROMPT_HEADER: &str = "Extract the search intent from this software-tool query.";

const MAX_SEMANTIC_VARIANTS: usize = 2;

/// Intent plus the signals it was built from.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub intent: IntentState,
    pub signals: ExtractionSignals,
}

/// Output of the name-resolution detector.
#[derive(Default)]
struct NameSignal {
    catalog: Arc<Catalog>,
    resolved: Vec<ResolvedName>,
}

/// Turns raw query text into an [`IntentState`].
pub struct IntentExtractor {
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    catalog: CatalogCache,
    detector_timeout: Duration,
}

impl IntentExtractor {
    #[must_use]
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        catalog: CatalogCache,
        detector_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            embedder,
            catalog,
            detector_timeout,
        }
    }

    /// Extract an intent. Never fails: every detector degrades to neutral.
    #[instrument(skip(self), fields(query_len = query.len()))]
    pub async fn extract(&self, query: &str) -> Extraction {
        let query = normalize_query(query);
        if query.is_empty() {
            return Extraction::default();
        }
        let timeout = self.detector_timeout;

        let (comparative, interfaces, semantic, names) = tokio::join!(
            fail_soft("comparative", timeout, comparative::detect(&query, &*self.embedder)),
            fail_soft("interface", timeout, async { Ok(interface::detect(&query)) }),
            fail_soft("semantic", timeout, semantic::prefilter(&query, &*self.embedder)),
            fail_soft("names", timeout, self.resolve_names(&query)),
        );

        let (reference_tool, classification, structured) = tokio::join!(
            fail_soft(
                "reference",
                timeout,
                reference::extract(&query, comparative.flag, &names.catalog, &*self.llm)
            ),
            fail_soft("classifier", timeout, async {
                Ok(classifier::classify(&query, &semantic, &*self.llm).await)
            }),
            fail_soft(
                "structuring",
                timeout,
                self.structure(&query, &interfaces, &names.resolved)
            ),
        );

        let signals = ExtractionSignals {
            comparative_flag: comparative.flag,
            comparative_confidence: comparative.confidence,
            comparison_mode: comparative.mode,
            interface_preferences: interfaces,
            reference_tool,
            resolved_tool_names: names.resolved.into_iter().map(|r| r.name).collect(),
            semantic_candidates: semantic,
            classification_scores: classification,
        };

        let intent = build_intent(&query, &signals, price::extract(&query), structured);
        debug!(
            goal = ?intent.primary_goal,
            confidence = intent.confidence,
            reference_tool = ?intent.reference_tool,
            "Extracted intent"
        );
        Extraction { intent, signals }
    }

    async fn resolve_names(&self, query: &str) -> Result<NameSignal, DetectorError> {
        let catalog = self.catalog.get().await;
        let recognized = entities::recognize(query, &catalog);
        let matched = fuzzy::match_names(query, &catalog);
        let resolved = name_resolver::resolve(&recognized, &matched);
        Ok(NameSignal { catalog, resolved })
    }

    async fn structure(
        &self,
        query: &str,
        interfaces: &std::collections::BTreeSet<String>,
        names: &[ResolvedName],
    ) -> Result<Option<LlmIntent>, DetectorError> {
        let answer = self.llm.invoke(&structuring_prompt(query, interfaces, names)).await?;
        let json = json_block(&answer, '{', '}')
            .ok_or_else(|| DetectorError::Parse("no JSON object in response".to_string()))?;
        serde_json::from_str(json)
            .map(Some)
            .map_err(|e| DetectorError::Parse(e.to_string()))
    }
}

fn structuring_prompt(
    query: &str,
    interfaces: &std::collections::BTreeSet<String>,
    names: &[ResolvedName],
) -> String {
    let vocabulary = Slot::ALL
        .iter()
        .map(|slot| format!("- {}: {}", slot.field(), slot.values().join(", ")))
        .collect::<Vec<_>>()
        .join("\n");
    let mut hints = Vec::new();
    if !interfaces.is_empty() {
        hints.push(format!(
            "Interfaces mentioned: {}",
            interfaces.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    if !names.is_empty() {
        hints.push(format!(
            "Known tools mentioned: {}",
            names.iter().map(|n| n.name.as_str()).collect::<Vec<_>>().join(", ")
        ));
    }
    let hints = if hints.is_empty() {
        String::new()
    } else {
        format!("\nHints:\n{}\n", hints.join("\n"))
    };

    format!(
        "{PROMPT_HEADER}\n\nQuery: \"{query}\"\n{hints}\n\
         Allowed values per field (use only these, leave a field empty when unsure):\n{vocabulary}\n\n\
         Respond with one JSON object with these keys: primaryGoal (find|compare|explore), \
         category, interface, functionality, pricingModel, deployment, userTypes (arrays of allowed values), \
         priceRange ({{min, max, currency, billingPeriod}} or null), \
         priceComparison ({{operator: less_than|greater_than|equal_to|around, value, currency, billingPeriod}} or null), \
         referenceTool (string or null), comparisonMode (direct|alternative|similar or null), \
         constraints (array of strings), filters (array of {{field, operator, value}}), \
         semanticVariants (up to two rephrasings of the query), confidence (0 to 1)."
    )
}

/// Merge detector signals and the structuring output into an intent.
///
/// Deterministic signals win: stated prices replace model prices, and
/// detected interfaces and pricing models are always kept. Model values go
/// through the vocabulary like everything else.
pub(super) fn build_intent(
    query: &str,
    signals: &ExtractionSignals,
    price: PriceSignal,
    structured: Option<LlmIntent>,
) -> IntentState {
    let llm = structured.unwrap_or_default();
    let mut intent = IntentState::new(query);

    intent.set_slot(Slot::Category, &llm.category);
    intent.set_slot(Slot::Interface, &llm.interface);
    intent.set_slot(Slot::Functionality, &llm.functionality);
    intent.set_slot(Slot::Deployment, &llm.deployment);
    intent.set_slot(Slot::UserType, &llm.user_types);
    intent.set_slot(Slot::PricingModel, &llm.pricing_model);

    intent.extend_slot(Slot::Interface, &signals.interface_preferences);
    intent.extend_slot(Slot::PricingModel, &price.pricing_models);

    for slot in [Slot::Category, Slot::Functionality, Slot::Deployment, Slot::UserType] {
        if intent.slot(slot).is_some_and(|v| v.is_empty())
            && let Some(picked) = signals.classified(slot)
            && picked.score >= classifier::LLM_CONFIDENCE
        {
            intent.extend_slot(slot, [&picked.value]);
        }
    }
    apply_model_filters(&mut intent, &llm.filters);

    if let Some(range) = price.range {
        intent.set_price_range(range);
    } else if let Some(comparison) = price.comparison {
        intent.set_price_comparison(comparison);
    } else {
        apply_model_price(&mut intent, &llm);
    }

    let comparative = signals.comparative_flag;
    let reference_tool = signals
        .reference_tool
        .clone()
        .or_else(|| comparative.then(|| llm.reference_tool.clone()).flatten())
        .filter(|name| !name.trim().is_empty());
    intent.reference_tool = reference_tool.map(|name| {
        signals
            .resolved_tool_names
            .iter()
            .find(|resolved| resolved.eq_ignore_ascii_case(&name))
            .cloned()
            .unwrap_or(name)
    });

    if comparative || intent.reference_tool.is_some() {
        intent.comparison_mode = signals.comparison_mode.or_else(|| {
            llm.comparison_mode
                .as_deref()
                .and_then(parse_comparison_mode)
        });
    }

    intent.primary_goal = llm
        .primary_goal
        .as_deref()
        .and_then(PrimaryGoal::parse)
        .unwrap_or_default();
    if comparative && signals.comparison_mode == Some(ComparisonMode::Direct) {
        intent.primary_goal = PrimaryGoal::Compare;
    }

    intent.constraints = llm
        .constraints
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let mut variants: Vec<String> = Vec::new();
    for variant in &llm.semantic_variants {
        let variant = normalize_query(variant);
        if !variant.is_empty()
            && !variant.eq_ignore_ascii_case(query)
            && !variants.iter().any(|v| v.eq_ignore_ascii_case(&variant))
        {
            variants.push(variant);
        }
    }
    variants.truncate(MAX_SEMANTIC_VARIANTS);
    intent.semantic_variants = variants;

    intent.confidence = llm
        .confidence
        .filter(|c| c.is_finite())
        .map_or_else(|| evidence_confidence(&intent, signals), |c| c.clamp(0.0, 1.0));
    intent
}

/// Fold model-proposed filters into slots that are still empty.
///
/// Filters are vocabulary-checked first; `intent.filters` keeps the accepted
/// ones in canonical form.
fn apply_model_filters(intent: &mut IntentState, filters: &[RawFilter]) {
    for filter in filters.iter().filter_map(validate_raw_filter) {
        let (Some(slot), FilterValue::List(values)) = (Slot::parse(&filter.field), &filter.value)
        else {
            continue;
        };
        if intent.slot(slot).is_some_and(|current| !current.is_empty()) {
            continue;
        }
        intent.set_slot(slot, values);
        intent.filters.push(RawFilter {
            field: filter.field.clone(),
            operator: filter.operator.as_str().to_string(),
            value: serde_json::Value::from(values.clone()),
        });
    }
}

/// Confidence from deterministic evidence alone, used when the model gave none.
fn evidence_confidence(intent: &IntentState, signals: &ExtractionSignals) -> f64 {
    let evidence = [
        !intent.interface.is_empty(),
        intent.has_price(),
        intent.pricing_model.is_some(),
        intent.reference_tool.is_some(),
        !signals.resolved_tool_names.is_empty(),
        Slot::ALL.iter().any(|slot| {
            signals
                .classified(*slot)
                .is_some_and(|p| p.score >= classifier::LLM_CONFIDENCE)
        }),
    ];
    let count = evidence.iter().filter(|e| **e).count();
    #[allow(clippy::cast_precision_loss)]
    let confidence = 0.1f64.mul_add(count as f64, 0.4);
    confidence.min(0.9)
}

fn apply_model_price(intent: &mut IntentState, llm: &LlmIntent) {
    if let Some(range) = &llm.price_range {
        let min = range.min.and_then(sanitize_price);
        let max = range.max.and_then(sanitize_price);
        if min.is_some() || max.is_some() {
            let (min, max) = match (min, max) {
                (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
                bounds => bounds,
            };
            intent.set_price_range(PriceRange {
                min,
                max,
                currency: parse_currency(range.currency.as_deref()),
                billing_period: range.billing_period.as_deref().and_then(BillingPeriod::parse),
            });
            return;
        }
    }
    if let Some(comparison) = &llm.price_comparison
        && let Some(operator) = comparison.operator.as_deref().and_then(PriceOperator::parse)
    {
        intent.set_price_comparison(PriceComparison {
            operator,
            value: comparison.value.and_then(sanitize_price),
            currency: parse_currency(comparison.currency.as_deref()),
            billing_period: comparison
                .billing_period
                .as_deref()
                .and_then(BillingPeriod::parse),
        });
    }
}

fn parse_currency(code: Option<&str>) -> CurrencyCode {
    code.and_then(CurrencyCode::parse).unwrap_or_default()
}

fn parse_comparison_mode(mode: &str) -> Option<ComparisonMode> {
    match mode.trim().to_lowercase().as_str() {
        "direct" => Some(ComparisonMode::Direct),
        "alternative" => Some(ComparisonMode::Alternative),
        "similar" => Some(ComparisonMode::Similar),
        _ => None,
    }
}

/// The structuring call's JSON answer. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct LlmIntent {
    primary_goal: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    category: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    interface: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    functionality: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pricing_model: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    deployment: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    user_types: Vec<String>,
    price_range: Option<LlmPrice>,
    price_comparison: Option<LlmPrice>,
    reference_tool: Option<String>,
    comparison_mode: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    constraints: Vec<String>,
    filters: Vec<RawFilter>,
    #[serde(deserialize_with = "one_or_many")]
    semantic_variants: Vec<String>,
    confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LlmPrice {
    min: Option<f64>,
    max: Option<f64>,
    operator: Option<String>,
    value: Option<f64>,
    currency: Option<String>,
    billing_period: Option<String>,
}

/// Accept a string, an array of strings, or null.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}
