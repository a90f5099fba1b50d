//! Document store client over a JSON Data API.
//!
//! Speaks the `action/find` endpoint: every request names a data source,
//! database and collection and carries a query-operator filter document.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use toolscout_core::{
    CapabilityError, Document, DocumentStore, FilterOperator, FilterValue, StructuredFilter,
};
use tracing::instrument;

use super::ProviderError;
use crate::config::DocumentStoreConfig;

/// Upper bound on documents returned by `get_all`.
const MAX_CATALOG_DOCUMENTS: usize = 10_000;

/// Client for the document store's Data API.
#[derive(Clone)]
pub struct DataApiClient {
    inner: Arc<DataApiClientInner>,
}

struct DataApiClientInner {
    client: reqwest::Client,
    base_url: String,
    data_source: String,
    database: String,
}

impl DataApiClient {
    /// Create a new Data API client.
    ///
    /// # Panics
    ///
    /// Panics if the API key contains invalid header characters.
    #[must_use]
    pub fn new(config: &DocumentStoreConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            headers.insert(
                "api-key",
                HeaderValue::from_str(api_key.expose_secret()).expect("Invalid API key for header"),
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(super::REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            inner: Arc::new(DataApiClientInner {
                client,
                base_url: config.url.clone(),
                data_source: config.data_source.clone(),
                database: config.database.clone(),
            }),
        }
    }

    /// Find documents matching a filter document.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self, filter), fields(source = %source, limit))]
    pub async fn find(
        &self,
        source: &str,
        filter: Value,
        limit: usize,
    ) -> Result<Vec<Document>, ProviderError> {
        let request = FindRequest {
            data_source: &self.inner.data_source,
            database: &self.inner.database,
            collection: source,
            filter,
            limit,
        };

        let response = self
            .inner
            .client
            .post(format!("{}/action/find", self.inner.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let response: FindResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(response.documents)
    }
}

#[async_trait]
impl DocumentStore for DataApiClient {
    async fn query(
        &self,
        source: &str,
        filters: &[StructuredFilter],
        limit: usize,
    ) -> Result<Vec<Document>, CapabilityError> {
        self.find(source, build_filter(filters), limit)
            .await
            .map_err(|e| e.into_capability("document store"))
    }

    async fn get_all(&self, source: &str) -> Result<Vec<Document>, CapabilityError> {
        self.find(source, json!({}), MAX_CATALOG_DOCUMENTS)
            .await
            .map_err(|e| e.into_capability("document store"))
    }
}

/// Translate structured filters into a query-operator document.
///
/// Bounds on the same field are merged, so a price range becomes
/// `{"pricing.monthly": {"$gte": a, "$lte": b}}`.
fn build_filter(filters: &[StructuredFilter]) -> Value {
    let mut document = Map::new();
    for filter in filters {
        let (operator, value) = match (&filter.operator, &filter.value) {
            (_, FilterValue::List(values)) => ("$in", json!(values)),
            (FilterOperator::Eq | FilterOperator::In, FilterValue::Text(text)) => {
                ("$eq", json!(text))
            }
            (FilterOperator::Eq | FilterOperator::In, FilterValue::Number(n)) => ("$eq", json!(n)),
            (FilterOperator::Lt, value) => ("$lt", json!(value)),
            (FilterOperator::Lte, value) => ("$lte", json!(value)),
            (FilterOperator::Gt, value) => ("$gt", json!(value)),
            (FilterOperator::Gte, value) => ("$gte", json!(value)),
        };

        let entry = document
            .entry(filter.field.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(ops) = entry {
            ops.insert(operator.to_string(), value);
        }
    }
    Value::Object(document)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindRequest<'a> {
    data_source: &'a str,
    database: &'a str,
    collection: &'a str,
    filter: Value,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_merges_bounds() {
        let filters = [
            StructuredFilter::one_of("pricingModel", ["Free"]),
            StructuredFilter::numeric("pricing.monthly", FilterOperator::Gte, 45.0),
            StructuredFilter::numeric("pricing.monthly", FilterOperator::Lte, 55.0),
        ];
        assert_eq!(
            build_filter(&filters),
            json!({
                "pricingModel": { "$in": ["Free"] },
                "pricing.monthly": { "$gte": 45.0, "$lte": 55.0 }
            })
        );
    }

    #[test]
    fn test_build_filter_empty() {
        assert_eq!(build_filter(&[]), json!({}));
    }

    #[test]
    fn test_find_request_serialization() {
        let request = FindRequest {
            data_source: "Cluster0",
            database: "toolscout",
            collection: "tools",
            filter: json!({}),
            limit: 50,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["dataSource"], "Cluster0");
        assert_eq!(json["limit"], 50);
    }
}
