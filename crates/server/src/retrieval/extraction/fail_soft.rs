//! Fail-soft wrapper shared by every detector.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use toolscout_core::CapabilityError;
use tracing::warn;

/// Why a detector could not produce a signal.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("could not parse model output: {0}")]
    Parse(String),
}

/// Run a detector with a timeout, substituting its neutral value on failure.
///
/// Errors and timeouts are logged and never propagate.
pub async fn fail_soft<T, F>(detector: &'static str, timeout: Duration, future: F) -> T
where
    T: Default,
    F: Future<Output = Result<T, DetectorError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            warn!(detector, error = %e, "Detector failed, using neutral result");
            T::default()
        }
        Err(_) => {
            warn!(
                detector,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Detector timed out, using neutral result"
            );
            T::default()
        }
    }
}
