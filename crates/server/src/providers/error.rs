//! Error types for the provider HTTP clients.

use reqwest::StatusCode;
use thiserror::Error;
use toolscout_core::CapabilityError;

/// Errors that can occur when calling an external API.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Response parsed but is unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Build an error from a non-success response, consuming its body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Self::RateLimited(retry_after);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Self::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => Self::Api {
                status: status.as_u16(),
                message: body,
            },
            Err(e) => Self::Http(e),
        }
    }

    /// Convert into a capability error for the named service.
    #[must_use]
    pub fn into_capability(self, service: &'static str) -> CapabilityError {
        match self {
            Self::RateLimited(retry_after) => CapabilityError::RateLimited {
                service,
                retry_after,
            },
            Self::Parse(message) | Self::InvalidResponse(message) => {
                CapabilityError::invalid_response(service, message)
            }
            other => CapabilityError::unavailable(service, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::RateLimited(60);
        assert_eq!(err.to_string(), "rate limited, retry after 60 seconds");

        let err = ProviderError::Api {
            status: 400,
            message: "bad filter".to_string(),
        };
        assert_eq!(err.to_string(), "API error (400): bad filter");
    }

    #[test]
    fn test_into_capability() {
        let err = ProviderError::RateLimited(5).into_capability("llm");
        assert!(matches!(
            err,
            CapabilityError::RateLimited {
                service: "llm",
                retry_after: 5
            }
        ));

        let err = ProviderError::Parse("eof".to_string()).into_capability("vector store");
        assert!(matches!(err, CapabilityError::InvalidResponse { .. }));

        let err = ProviderError::Unauthorized("nope".to_string()).into_capability("embeddings");
        assert_eq!(err.to_string(), "embeddings unavailable: unauthorized: nope");
    }
}
