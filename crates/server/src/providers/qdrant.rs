//! Qdrant REST client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use toolscout_core::{
    CapabilityError, CollectionInfo, FilterOperator, FilterValue, StructuredFilter, VectorHit,
    VectorStore,
};
use tracing::instrument;

use super::ProviderError;
use crate::config::QdrantConfig;

/// Client for the Qdrant points search API.
#[derive(Clone)]
pub struct QdrantClient {
    inner: Arc<QdrantClientInner>,
}

struct QdrantClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl QdrantClient {
    /// Create a new Qdrant client.
    ///
    /// # Panics
    ///
    /// Panics if the API key contains invalid header characters.
    #[must_use]
    pub fn new(config: &QdrantConfig) -> Self {
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
            inner: Arc::new(QdrantClientInner {
                client,
                base_url: config.url.clone(),
            }),
        }
    }

    /// Nearest-neighbour search in one collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self, vector, filters), fields(collection = %collection, top_k))]
    pub async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filters: Option<&[StructuredFilter]>,
    ) -> Result<Vec<VectorHit>, ProviderError> {
        let request = SearchRequest {
            vector,
            limit: top_k,
            with_payload: true,
            filter: filters.filter(|f| !f.is_empty()).map(build_filter),
        };

        let response = self
            .inner
            .client
            .post(format!(
                "{}/collections/{collection}/points/search",
                self.inner.base_url
            ))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let response: QdrantResponse<Vec<ScoredPoint>> = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| VectorHit {
                id: point_id(&point.id),
                score: point.score,
                payload: point.payload.unwrap_or(Value::Null),
            })
            .collect())
    }

    /// Fetch collection metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self), fields(collection = %collection))]
    pub async fn collection(&self, collection: &str) -> Result<CollectionInfo, ProviderError> {
        let response = self
            .inner
            .client
            .get(format!("{}/collections/{collection}", self.inner.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let response: QdrantResponse<CollectionResult> = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(CollectionInfo {
            point_count: response.result.points_count.unwrap_or(0),
        })
    }
}

#[async_trait]
impl VectorStore for QdrantClient {
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filters: Option<&[StructuredFilter]>,
    ) -> Result<Vec<VectorHit>, CapabilityError> {
        self.search(collection, vector, top_k, filters)
            .await
            .map_err(|e| e.into_capability("vector store"))
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo, CapabilityError> {
        self.collection(collection)
            .await
            .map_err(|e| e.into_capability("vector store"))
    }
}

/// Translate structured filters into a Qdrant `must` filter.
fn build_filter(filters: &[StructuredFilter]) -> Value {
    let must: Vec<Value> = filters.iter().map(condition).collect();
    json!({ "must": must })
}

fn condition(filter: &StructuredFilter) -> Value {
    let key = &filter.field;
    match (&filter.operator, &filter.value) {
        (FilterOperator::In, FilterValue::List(values)) => {
            json!({ "key": key, "match": { "any": values } })
        }
        (_, FilterValue::Text(value)) => json!({ "key": key, "match": { "value": value } }),
        (FilterOperator::Eq, FilterValue::Number(n)) => {
            json!({ "key": key, "range": { "gte": n, "lte": n } })
        }
        (operator, FilterValue::Number(n)) => {
            let bound = match operator {
                FilterOperator::Lt => "lt",
                FilterOperator::Lte => "lte",
                FilterOperator::Gt => "gt",
                _ => "gte",
            };
            json!({ "key": key, "range": { bound: n } })
        }
        (_, FilterValue::List(values)) => json!({ "key": key, "match": { "any": values } }),
    }
}

/// Qdrant point ids are unsigned integers or UUID strings.
fn point_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f64,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CollectionResult {
    #[serde(default)]
    points_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_translates_operators() {
        let filters = [
            StructuredFilter::one_of("interface", ["CLI"]),
            StructuredFilter::numeric("pricing.monthly", FilterOperator::Lt, 50.0),
        ];
        let filter = build_filter(&filters);
        assert_eq!(
            filter,
            json!({
                "must": [
                    { "key": "interface", "match": { "any": ["CLI"] } },
                    { "key": "pricing.monthly", "range": { "lt": 50.0 } }
                ]
            })
        );
    }

    #[test]
    fn test_numeric_equality_is_closed_range() {
        let filter = StructuredFilter::numeric("pricing.monthly", FilterOperator::Eq, 10.0);
        assert_eq!(
            condition(&filter),
            json!({ "key": "pricing.monthly", "range": { "gte": 10.0, "lte": 10.0 } })
        );
    }

    #[test]
    fn test_point_id_forms() {
        assert_eq!(point_id(&json!(7)), "7");
        assert_eq!(point_id(&json!("a1b2")), "a1b2");
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{"result":[{"id":3,"score":0.87,"payload":{"name":"Aider"}}],"status":"ok","time":0.001}"#;
        let response: QdrantResponse<Vec<ScoredPoint>> =
            serde_json::from_str(body).expect("deserialize");
        assert_eq!(response.result.len(), 1);
        assert!((response.result[0].score - 0.87).abs() < f64::EPSILON);
    }
}
