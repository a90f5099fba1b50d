//! `search` and `plan` commands.

use tracing::info;

use super::{print_json, state};

/// Run a full search and print the executor output.
///
/// # Errors
///
/// Returns an error if configuration is missing or output cannot be written.
pub async fn search(query: &str, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let state = state()?;
    let output = state.pipeline().search(query, limit.max(1)).await;
    info!(
        candidates = output.candidates.len(),
        terminal_state = ?output.execution_stats.terminal_state,
        "Search finished"
    );
    print_json(&output)
}

/// Print the extracted intent, its signals and the plan.
///
/// # Errors
///
/// Returns an error if configuration is missing or output cannot be written.
pub async fn plan(query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let state = state()?;
    let planned = state.pipeline().plan(query).await;
    print_json(&planned)
}
