//! Deterministic price extraction.
//!
//! Runs alongside the structuring call and wins over it: amounts, ranges,
//! billing periods and pricing-model keywords the query states outright are
//! never left to the model.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use toolscout_core::{
    BillingPeriod, CurrencyCode, PriceComparison, PriceOperator, PriceRange, sanitize_price,
};

const AMOUNT: &str = r"(?P<{p}cur>[$€£])?\s*(?P<{p}num>\d+(?:,\d{3})*(?:\.\d+)?)\s*(?P<{p}k>k\b)?\s*(?P<{p}code>usd|eur|gbp|cad|aud|dollars?|euros?|pounds?)?";

fn amount(prefix: &str) -> String {
    AMOUNT.replace("{p}", prefix)
}

static BETWEEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\bbetween\s+{}\s+(?:and|to)\s+{}",
        amount("a"),
        amount("b")
    ))
    .expect("Invalid regex")
});

static DASH_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    let a = amount("a").replacen("[$€£])?", "[$€£])", 1);
    Regex::new(&format!(r"(?i){a}\s*(?:-|–|to)\s*{}", amount("b"))).expect("Invalid regex")
});

static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?P<op>\bunder|\bbelow|\bless\s+than|\bcheaper\s+than|\bup\s+to|\bat\s+most|\bno\s+more\s+than|\bmax(?:imum)?|\bover|\babove|\bmore\s+than|\bat\s+least|\bgreater\s+than|\baround|\babout|\bapproximately|\broughly|~|\bexactly)\s*{}",
        amount("a")
    ))
    .expect("Invalid regex")
});

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:cheaper|less\s+expensive|more\s+affordable|lower[-\s]priced|inexpensive)\b")
        .expect("Invalid regex")
});

static MONTHLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bper\s+month\b|/\s*mo(?:nth)?\b|\ba\s+month\b|\bmonthly\b)").expect("Invalid regex")
});

static YEARLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bper\s+year\b|/\s*(?:yr|year)\b|\ba\s+year\b|\byearly\b|\bannual(?:ly)?\b)")
        .expect("Invalid regex")
});

static ONE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:one[-\s]time|lifetime)\b").expect("Invalid regex"));

static FREE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:free|open[-\s]source|freemium)\b(?P<after>\s+trials?\b)?").expect("Invalid regex")
});

static PAID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:paid|commercial|premium)\b").expect("Invalid regex"));

/// Price facts stated in the query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSignal {
    pub range: Option<PriceRange>,
    pub comparison: Option<PriceComparison>,
    pub pricing_models: BTreeSet<String>,
}

impl PriceSignal {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_none() && self.comparison.is_none() && self.pricing_models.is_empty()
    }
}

/// Parse the amount captured under `prefix`, with its currency.
fn captured_amount(caps: &Captures<'_>, prefix: &str) -> Option<(f64, Option<CurrencyCode>)> {
    let num = caps.name(&format!("{prefix}num"))?.as_str().replace(',', "");
    let mut value: f64 = num.parse().ok()?;
    if caps.name(&format!("{prefix}k")).is_some() {
        value *= 1000.0;
    }
    let currency = caps
        .name(&format!("{prefix}cur"))
        .and_then(|m| CurrencyCode::parse(m.as_str()))
        .or_else(|| {
            caps.name(&format!("{prefix}code"))
                .and_then(|m| currency_word(m.as_str()))
        });
    Some((sanitize_price(value)?, currency))
}

fn currency_word(word: &str) -> Option<CurrencyCode> {
    match word.to_lowercase().trim_end_matches('s') {
        "dollar" => Some(CurrencyCode::USD),
        "euro" => Some(CurrencyCode::EUR),
        "pound" => Some(CurrencyCode::GBP),
        code => CurrencyCode::parse(code),
    }
}

fn operator(word: &str) -> Option<PriceOperator> {
    let word = word.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    match word.as_str() {
        "under" | "below" | "less than" | "cheaper than" | "up to" | "at most" | "no more than"
        | "max" | "maximum" => Some(PriceOperator::LessThan),
        "over" | "above" | "more than" | "at least" | "greater than" => {
            Some(PriceOperator::GreaterThan)
        }
        "around" | "about" | "approximately" | "roughly" | "~" => Some(PriceOperator::Around),
        "exactly" => Some(PriceOperator::EqualTo),
        _ => None,
    }
}

fn billing_period(query: &str) -> Option<BillingPeriod> {
    if MONTHLY.is_match(query) {
        Some(BillingPeriod::Monthly)
    } else if YEARLY.is_match(query) {
        Some(BillingPeriod::Yearly)
    } else if ONE_TIME.is_match(query) {
        Some(BillingPeriod::OneTime)
    } else {
        None
    }
}

fn range(query: &str) -> Option<(f64, f64, Option<CurrencyCode>)> {
    let caps = BETWEEN.captures(query).or_else(|| DASH_RANGE.captures(query))?;
    let (a, cur_a) = captured_amount(&caps, "a")?;
    let (b, cur_b) = captured_amount(&caps, "b")?;
    Some((a.min(b), a.max(b), cur_a.or(cur_b)))
}

/// Extract every price fact from the query.
#[must_use]
pub fn extract(query: &str) -> PriceSignal {
    let billing_period = billing_period(query);
    let mut signal = PriceSignal::default();

    if let Some((min, max, currency)) = range(query) {
        signal.range = Some(PriceRange {
            min: Some(min),
            max: Some(max),
            currency: currency.unwrap_or_default(),
            billing_period,
        });
    } else if let Some(caps) = COMPARISON.captures(query)
        && let Some(op) = caps.name("op").and_then(|m| operator(m.as_str()))
        && let Some((value, currency)) = captured_amount(&caps, "a")
        && (currency.is_some() || billing_period.is_some())
    {
        signal.comparison = Some(PriceComparison {
            operator: op,
            value: Some(value),
            currency: currency.unwrap_or_default(),
            billing_period,
        });
    } else if RELATIVE.is_match(query) {
        signal.comparison = Some(PriceComparison {
            operator: PriceOperator::LessThan,
            value: None,
            currency: CurrencyCode::default(),
            billing_period,
        });
    }

    if FREE
        .captures_iter(query)
        .any(|caps| caps.name("after").is_none())
    {
        signal.pricing_models.insert("Free".to_string());
    }
    if PAID.is_match(query) {
        signal.pricing_models.insert("Paid".to_string());
    }
    signal
}
