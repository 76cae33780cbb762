//! Rate-limited client for the search upstream.
//!
//! Thin async wrapper around the search service's REST API. Every call is
//! admitted through the sliding-window limiter first, and every completed
//! call logs its outcome (status, duration) whether it succeeded or not.
//! Non-success statuses surface as [`GatewayError::Upstream`]; there is no
//! retry loop here.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::Instant;

use crate::config::schema::UpstreamConfig;
use crate::error::GatewayError;
use crate::upstream::rate_limit::RateLimiter;

const API_VERSION: &str = "2024-07-01";
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum upstream body bytes carried into an error detail.
const ERROR_SNIPPET_LEN: usize = 300;

/// Keyword/semantic search parameters. Collaborators build the query
/// server-side; callers of the gateway never see the upstream syntax.
#[derive(Debug, Default)]
pub struct SearchQuery {
    pub search: String,
    pub filter: Option<String>,
    pub select: Option<Vec<&'static str>>,
    pub top: usize,
    pub semantic_config: Option<&'static str>,
}

/// Hybrid (keyword + vector + semantic rerank) search parameters.
#[derive(Debug)]
pub struct HybridQuery {
    pub search: String,
    pub select: Option<Vec<&'static str>>,
    pub top: usize,
    pub vector_fields: &'static str,
    pub semantic_config: Option<&'static str>,
    pub answers: Option<&'static str>,
    pub captions: Option<&'static str>,
}

/// Rate-limited search upstream client.
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    limiter: RateLimiter,
}

impl SearchClient {
    pub fn new(config: &UpstreamConfig, limiter: RateLimiter) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            limiter,
        })
    }

    /// The admission limiter shared by every call through this client.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Execute a search query against an index.
    pub async fn search(&self, index: &str, query: &SearchQuery) -> Result<Value, GatewayError> {
        let mut body = json!({
            "search": query.search,
            "queryType": if query.semantic_config.is_some() { "semantic" } else { "simple" },
            "top": query.top,
            "count": true,
        });
        if let Some(filter) = &query.filter {
            body["filter"] = json!(filter);
        }
        if let Some(select) = &query.select {
            body["select"] = json!(select.join(","));
        }
        if let Some(config) = query.semantic_config {
            body["semanticConfiguration"] = json!(config);
        }
        self.post_search(index, body).await
    }

    /// Hybrid search: keyword + vector + semantic reranking.
    pub async fn hybrid_search(&self, index: &str, query: &HybridQuery) -> Result<Value, GatewayError> {
        let mut body = json!({
            "search": query.search,
            "queryType": "semantic",
            "top": query.top,
            "count": true,
            "vectorQueries": [{
                "kind": "text",
                "text": query.search,
                "fields": query.vector_fields,
                "k": query.top,
            }],
        });
        if let Some(select) = &query.select {
            body["select"] = json!(select.join(","));
        }
        if let Some(config) = query.semantic_config {
            body["semanticConfiguration"] = json!(config);
        }
        if let Some(answers) = query.answers {
            body["answers"] = json!(answers);
        }
        if let Some(captions) = query.captions {
            body["captions"] = json!(captions);
        }
        self.post_search(index, body).await
    }

    /// Fetch a single document by key. Returns `None` when the index has no
    /// document under that key.
    pub async fn get_document(
        &self,
        index: &str,
        key: &str,
        select: &[&str],
    ) -> Result<Option<Value>, GatewayError> {
        let path = format!("/indexes/{index}/docs('{key}')");
        let mut url = format!("{}{}?api-version={}", self.endpoint, path, API_VERSION);
        if !select.is_empty() {
            url.push_str("&$select=");
            url.push_str(&select.join(","));
        }

        self.limiter.acquire(index).await;
        let started = Instant::now();
        let result = self.request(self.http.get(&url)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let status = response.status();
                tracing::info!(
                    api = "search",
                    method = "GET",
                    path = %path,
                    status = status.as_u16(),
                    duration_ms,
                    "upstream_call"
                );
                if status.as_u16() == 404 {
                    return Ok(None);
                }
                self.decode(response).await.map(Some)
            }
            Err(err) => {
                tracing::warn!(api = "search", method = "GET", path = %path, duration_ms, error = %err, "upstream_call_failed");
                Err(err)
            }
        }
    }

    async fn post_search(&self, index: &str, body: Value) -> Result<Value, GatewayError> {
        let path = format!("/indexes/{index}/docs/search");
        let url = format!("{}{}?api-version={}", self.endpoint, path, API_VERSION);

        self.limiter.acquire(index).await;
        let started = Instant::now();
        let result = self.request(self.http.post(&url).json(&body)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let status = response.status();
                tracing::info!(
                    api = "search",
                    method = "POST",
                    path = %path,
                    status = status.as_u16(),
                    duration_ms,
                    "upstream_call"
                );
                self.decode(response).await
            }
            Err(err) => {
                tracing::warn!(api = "search", method = "POST", path = %path, duration_ms, error = %err, "upstream_call_failed");
                Err(err)
            }
        }
    }

    async fn request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        let builder = if self.api_key.is_empty() {
            builder
        } else {
            builder.header("api-key", &self.api_key)
        };
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Upstream {
                    status: 504,
                    detail: "upstream request timed out".to_string(),
                }
            } else {
                GatewayError::Upstream {
                    status: 502,
                    detail: e.to_string(),
                }
            }
        })
    }

    async fn decode(&self, response: reqwest::Response) -> Result<Value, GatewayError> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| GatewayError::Upstream {
                status: 502,
                detail: format!("invalid JSON from upstream: {e}"),
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::Upstream {
                status: status.as_u16(),
                detail: snippet(&body),
            })
        }
    }
}

fn snippet(body: &str) -> String {
    if body.chars().count() <= ERROR_SNIPPET_LEN {
        body.to_string()
    } else {
        let mut s: String = body.chars().take(ERROR_SNIPPET_LEN).collect();
        s.push('…');
        s
    }
}
