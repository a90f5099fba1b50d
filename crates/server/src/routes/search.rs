//! `POST /search`.

use axum::{Json, extract::State};
use serde::Deserialize;
use toolscout_core::QueryExecutorOutput;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Longest accepted query, in characters.
pub const MAX_QUERY_CHARS: usize = 512;
/// Candidates returned when the request sets no limit.
pub const DEFAULT_LIMIT: usize = 20;
/// Largest accepted limit.
pub const MAX_LIMIT: usize = 100;

/// Search request body.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl SearchRequest {
    /// The requested limit clamped to `[1, MAX_LIMIT]`.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.map_or(DEFAULT_LIMIT, |limit| {
            usize::try_from(limit.max(1)).map_or(MAX_LIMIT, |limit| limit.min(MAX_LIMIT))
        })
    }
}

/// Run the pipeline. Backend failures degrade the result, never the status.
#[instrument(skip(state, request), fields(query_len = request.query.len()))]
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<QueryExecutorOutput>> {
    if request.query.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::BadRequest(format!(
            "query must be at most {MAX_QUERY_CHARS} characters"
        )));
    }
    let output = state
        .pipeline()
        .search(&request.query, request.effective_limit())
        .await;
    Ok(Json(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(limit: Option<i64>) -> SearchRequest {
        SearchRequest {
            query: "free cli".to_string(),
            limit,
        }
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(request(None).effective_limit(), DEFAULT_LIMIT);
        assert_eq!(request(Some(0)).effective_limit(), 1);
        assert_eq!(request(Some(-5)).effective_limit(), 1);
        assert_eq!(request(Some(7)).effective_limit(), 7);
        assert_eq!(request(Some(10_000)).effective_limit(), MAX_LIMIT);
    }
}
