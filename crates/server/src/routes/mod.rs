//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! POST /search  - Run the retrieval pipeline for a free-text query
//! ```

pub mod search;

use axum::{Router, routing::post};

use crate::state::AppState;

/// Create the application routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/search", post(search::search))
}
