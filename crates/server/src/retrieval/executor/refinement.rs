//! The bounded plan, execute, assess loop.
//!
//! ```text
//! Planned -> Executed -> Accepted
//!                     -> Refining -> Planned
//!                     -> ExhaustedBudget
//! ```
//!
//! Every cycle consumes budget, so the loop runs at most
//! `max_refinement_cycles` extra passes. All passes share one deadline; once
//! it has passed no new cycle starts.

use std::time::Instant;

use toolscout_core::{IntentState, QueryExecutorOutput, QueryPlan, Slot, TerminalState};
use tracing::{info, instrument};

use super::QueryExecutor;
use super::quality::Quality;
use crate::retrieval::planner::{PlanOptions, QueryPlanner};

/// Source-size multiplier applied per cycle.
pub const BOOST: f64 = 1.5;
/// Cycles allowed per kind.
pub const MAX_PER_KIND: u8 = 2;

/// Order in which slots are relaxed by expansion.
const RELAX_ORDER: [Slot; 6] = [
    Slot::Functionality,
    Slot::Deployment,
    Slot::UserType,
    Slot::Interface,
    Slot::Category,
    Slot::PricingModel,
];

/// What a cycle changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Too few results: drop one constraint and widen the sources.
    Expansion,
    /// Weak results: widen the sources, drop what the model alone proposed
    /// and rerank the head.
    Refinement,
}

/// Remaining cycle budget, tracked per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBudget {
    max_total: u8,
    expansions: u8,
    refinements: u8,
}

impl CycleBudget {
    #[must_use]
    pub const fn new(max_total: u8) -> Self {
        Self {
            max_total,
            expansions: 0,
            refinements: 0,
        }
    }

    #[must_use]
    pub const fn used(&self) -> u8 {
        self.expansions + self.refinements
    }

    /// Pick and record the next cycle, or `None` once the budget is spent.
    pub fn next(&mut self, quality: &Quality, can_expand: bool) -> Option<CycleKind> {
        if self.used() >= self.max_total {
            return None;
        }
        let expand = can_expand && self.expansions < MAX_PER_KIND;
        let refine = self.refinements < MAX_PER_KIND;
        let kind = match (quality.needs_expansion(), expand, refine) {
            (true, true, _) | (false, true, false) => CycleKind::Expansion,
            (_, _, true) => CycleKind::Refinement,
            _ => return None,
        };
        match kind {
            CycleKind::Expansion => self.expansions += 1,
            CycleKind::Refinement => self.refinements += 1,
        }
        Some(kind)
    }
}

/// Drop the first populated constraint in relax order (price first).
#[must_use]
pub fn relax(intent: &IntentState) -> Option<IntentState> {
    let mut relaxed = intent.clone();
    if relaxed.has_price() {
        relaxed.clear_price();
        return Some(relaxed);
    }
    let slot = RELAX_ORDER
        .into_iter()
        .find(|slot| intent.slot(*slot).is_some_and(|values| !values.is_empty()))?;
    relaxed.clear_slot(slot);
    Some(relaxed)
}

/// Drop free-form constraints and the slots filled only by model-proposed
/// filters.
#[must_use]
pub fn refine(intent: &IntentState) -> IntentState {
    let mut refined = intent.clone();
    refined.constraints.clear();
    for filter in std::mem::take(&mut refined.filters) {
        if let Some(slot) = Slot::parse(&filter.field) {
            refined.clear_slot(slot);
        }
    }
    refined
}

/// Execute `plan`, then refine until the results pass the quality gate, the
/// plan's cycle budget runs out or `deadline` passes.
///
/// Returns the last pass's candidates with stats accumulated over every pass.
#[instrument(skip_all, fields(max_cycles = plan.max_refinement_cycles))]
pub async fn execute_with_refinement(
    planner: &QueryPlanner,
    executor: &QueryExecutor,
    intent: &IntentState,
    plan: &QueryPlan,
    deadline: tokio::time::Instant,
) -> QueryExecutorOutput {
    let started = Instant::now();
    let mut budget = CycleBudget::new(plan.max_refinement_cycles);
    let mut intent = intent.clone();

    let mut output = executor.execute_until(plan, &intent.query, deadline).await;
    let mut stats = output.execution_stats.clone();

    let terminal_state = loop {
        let quality = Quality::assess(&output.candidates);
        if quality.is_acceptable() {
            break TerminalState::Accepted;
        }
        if tokio::time::Instant::now() >= deadline {
            info!(cycles = budget.used(), "Search deadline passed, keeping current results");
            break TerminalState::ExhaustedBudget;
        }
        let relaxed = relax(&intent);
        let Some(kind) = budget.next(&quality, relaxed.is_some()) else {
            break TerminalState::ExhaustedBudget;
        };

        match (kind, relaxed) {
            (CycleKind::Expansion, Some(relaxed)) => {
                intent = relaxed;
                stats.expansion_cycles += 1;
            }
            _ => {
                intent = refine(&intent);
                stats.refinement_cycles += 1;
            }
        }
        info!(
            cycle = budget.used(),
            kind = ?kind,
            confidence = quality.confidence,
            results = quality.result_count,
            "Quality gate failed, re-planning"
        );

        let options = PlanOptions {
            boost: BOOST.powi(i32::from(budget.used())),
            skip_advisor: true,
            force_rerank: kind == CycleKind::Refinement,
        };
        let next_plan = planner.plan_with(&intent, options).await;
        output = executor.execute_until(&next_plan, &intent.query, deadline).await;
        stats.absorb(&output.execution_stats);
    };

    stats.terminal_state = terminal_state;
    stats.latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    output.execution_stats = stats;
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolscout_core::{CurrencyCode, PriceComparison, PriceOperator, RawFilter};

    fn poor(result_count: usize) -> Quality {
        Quality {
            confidence: 0.1,
            result_count,
            average_relevance: 0.1,
            diversity: 0.1,
        }
    }

    #[test]
    fn test_budget_caps_total_cycles() {
        let mut budget = CycleBudget::new(2);
        assert_eq!(budget.next(&poor(10), true), Some(CycleKind::Refinement));
        assert_eq!(budget.next(&poor(0), true), Some(CycleKind::Expansion));
        assert_eq!(budget.next(&poor(0), true), None);
        assert_eq!(budget.used(), 2);
    }

    #[test]
    fn test_each_kind_is_capped() {
        let mut budget = CycleBudget::new(5);
        let kinds: Vec<_> = std::iter::from_fn(|| budget.next(&poor(0), true)).collect();
        assert_eq!(
            kinds,
            vec![
                CycleKind::Expansion,
                CycleKind::Expansion,
                CycleKind::Refinement,
                CycleKind::Refinement
            ]
        );
    }

    #[test]
    fn test_expansion_falls_back_to_refinement() {
        let mut budget = CycleBudget::new(2);
        assert_eq!(budget.next(&poor(0), false), Some(CycleKind::Refinement));
    }

    #[test]
    fn test_relax_order() {
        let mut intent = IntentState::new("q");
        intent.set_slot(Slot::Interface, ["CLI"]);
        intent.set_slot(Slot::Deployment, ["Local"]);
        intent.set_price_comparison(PriceComparison {
            operator: PriceOperator::LessThan,
            value: Some(10.0),
            currency: CurrencyCode::USD,
            billing_period: None,
        });

        let first = relax(&intent).expect("price");
        assert!(!first.has_price());
        let second = relax(&first).expect("deployment");
        assert!(second.deployment.is_empty());
        assert_eq!(second.interface.len(), 1);
        let third = relax(&second).expect("interface");
        assert!(relax(&third).is_none());
    }

    #[test]
    fn test_refine_drops_model_only_slots() {
        let mut intent = IntentState::new("q");
        intent.constraints.insert("open source".to_string());
        intent.set_slot(Slot::Interface, ["CLI"]);
        intent.set_slot(Slot::Deployment, ["Self-Hosted"]);
        intent.filters.push(RawFilter {
            field: "deployment".to_string(),
            operator: "in".to_string(),
            value: json!(["Self-Hosted"]),
        });

        let refined = refine(&intent);
        assert!(refined.constraints.is_empty());
        assert!(refined.filters.is_empty());
        assert!(refined.deployment.is_empty());
        assert_eq!(refined.interface.len(), 1);
    }
}
