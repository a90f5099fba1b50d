//! Core types for ToolScout.
//!
//! These are the values that flow through the retrieval pipeline, in order:
//! extraction signals, intent, plan, and candidates.

pub mod candidate;
pub mod intent;
pub mod plan;
pub mod price;
pub mod signals;

pub use candidate::{
    Candidate, CandidateMetadata, CandidateSource, ExecutionStats, Provenance,
    QueryExecutorOutput, TerminalState, document_id,
};
pub use intent::{ComparisonMode, IntentState, PrimaryGoal, RawFilter};
pub use plan::{
    FilterOperator, FilterValue, FusionMethod, MAX_REFINEMENT_CYCLES, MAX_TOTAL_RESULTS,
    QueryPlan, QueryVectorSource, RerankerConfig, RerankerType, Strategy, StructuredFilter,
    StructuredSource, VectorSource,
};
pub use price::{
    BillingPeriod, CurrencyCode, PriceComparison, PriceOperator, PriceRange, sanitize_price,
};
pub use signals::{ExtractionSignals, ScoredValue};
