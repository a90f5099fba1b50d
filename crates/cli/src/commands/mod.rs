//! CLI command implementations.

pub mod execute;
pub mod search;

use serde::Serialize;
use toolscout_server::config::ServerConfig;
use toolscout_server::state::AppState;

/// Build the pipeline from environment configuration.
fn state() -> Result<AppState, Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    Ok(AppState::from_config(&config))
}

/// Write a value to stdout as pretty JSON.
#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
