//! SPC document search — hybrid search over full-text document chunks.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::drugs::clamp_max_results;
use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::upstream::{HybridQuery, SearchClient};

pub const INDEX: &str = "sukl-documents";
const SEMANTIC_CONFIG: &str = "sukl-semantic";

/// Fields returned (the large vector field is excluded).
const SELECT_FIELDS: [&str; 5] = ["chunk_id", "parent_id", "chunk", "title", "drug_codes"];

const MAX_RESULTS_CEILING: usize = 10;
const DEFAULT_RESULTS: usize = 5;

/// Chunks longer than this are cut in responses.
const MAX_CHUNK_LEN: usize = 2000;

/// Extractive answers below this confidence are dropped.
const MIN_ANSWER_SCORE: f64 = 0.5;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DocumentSearchParams {
    pub q: String,
    #[serde(rename = "maxResults")]
    pub max_results: Option<usize>,
}

/// `GET /api/documents/search`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<DocumentSearchParams>,
) -> Result<Json<Value>, GatewayError> {
    search_documents(&state.search, &params).await.map(Json)
}

/// Hybrid search over SPC document chunks. Shared by REST and protocol tools.
pub async fn search_documents(
    search: &SearchClient,
    params: &DocumentSearchParams,
) -> Result<Value, GatewayError> {
    if params.q.trim().chars().count() < 2 {
        return Err(GatewayError::Validation(
            "Parametr q musí mít alespoň 2 znaky.".to_string(),
        ));
    }
    let top = clamp_max_results(params.max_results, DEFAULT_RESULTS, MAX_RESULTS_CEILING)?;

    let query = HybridQuery {
        search: params.q.clone(),
        select: Some(SELECT_FIELDS.to_vec()),
        top,
        vector_fields: "chunk_vector",
        semantic_config: Some(SEMANTIC_CONFIG),
        answers: Some("extractive|count-3"),
        captions: Some("extractive|highlight-true"),
    };
    let result = search.hybrid_search(INDEX, &query).await?;

    let chunks: Vec<Value> = result
        .get("value")
        .and_then(Value::as_array)
        .map(|docs| docs.iter().map(format_chunk).collect())
        .unwrap_or_default();

    let mut response = json!({
        "total": result.get("@odata.count").and_then(Value::as_u64).unwrap_or(chunks.len() as u64),
        "results": chunks,
    });

    if let Some(answers) = result.get("@search.answers").and_then(Value::as_array) {
        let confident = format_answers(answers);
        if !confident.is_empty() {
            response["answers"] = json!(confident);
        }
    }

    Ok(response)
}

fn format_chunk(doc: &Value) -> Value {
    let mut content = doc
        .get("chunk")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if content.chars().count() > MAX_CHUNK_LEN {
        content = content.chars().take(MAX_CHUNK_LEN).collect();
        content.push('…');
    }

    let mut entry = json!({
        "title": doc.get("title").and_then(Value::as_str).unwrap_or_default(),
        "drugCodes": doc.get("drug_codes").and_then(Value::as_str).unwrap_or_default(),
        "content": content,
    });

    // Semantic captions, when present, carry the best-matching highlight.
    if let Some(caption) = doc
        .get("@search.captions")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    {
        let highlight = caption
            .get("highlights")
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
            .or_else(|| caption.get("text").and_then(Value::as_str))
            .unwrap_or_default();
        entry["highlight"] = json!(highlight);
    }

    if let Some(score) = doc.get("@search.rerankerScore").and_then(Value::as_f64) {
        entry["relevance"] = json!((score * 100.0).round() / 100.0);
    }

    entry
}

fn format_answers(answers: &[Value]) -> Vec<Value> {
    answers
        .iter()
        .filter(|a| a.get("score").and_then(Value::as_f64).unwrap_or(0.0) > MIN_ANSWER_SCORE)
        .map(|a| {
            let text = a.get("text").and_then(Value::as_str).unwrap_or_default();
            let highlight = a
                .get("highlights")
                .and_then(Value::as_str)
                .filter(|h| !h.is_empty())
                .unwrap_or(text);
            json!({
                "text": text,
                "highlight": highlight,
                "confidence": (a.get("score").and_then(Value::as_f64).unwrap_or(0.0) * 100.0).round() / 100.0,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn short_query_is_rejected_before_any_upstream_call() {
        use crate::config::schema::UpstreamConfig;
        use crate::upstream::RateLimiter;
        use std::time::Duration;

        let config = UpstreamConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: String::new(),
        };
        let client = SearchClient::new(&config, RateLimiter::new(1, Duration::from_secs(1))).unwrap();
        let params = DocumentSearchParams {
            q: "a".into(),
            max_results: None,
        };
        let err = search_documents(&client, &params).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn long_chunks_are_truncated() {
        let doc = json!({"chunk": "x".repeat(3000), "title": "SPC", "drug_codes": "0000001"});
        let entry = format_chunk(&doc);
        let content = entry["content"].as_str().unwrap();
        assert_eq!(content.chars().count(), MAX_CHUNK_LEN + 1);
        assert!(content.ends_with('…'));
    }

    #[test]
    fn caption_highlight_prefers_highlights_field() {
        let doc = json!({
            "chunk": "text",
            "@search.captions": [{"highlights": "<em>dávkování</em>", "text": "plain"}],
        });
        let entry = format_chunk(&doc);
        assert_eq!(entry["highlight"], "<em>dávkování</em>");
    }

    #[test]
    fn caption_falls_back_to_text_when_highlights_empty() {
        let doc = json!({
            "chunk": "text",
            "@search.captions": [{"highlights": "", "text": "plain"}],
        });
        let entry = format_chunk(&doc);
        assert_eq!(entry["highlight"], "plain");
    }

    #[test]
    fn reranker_score_is_rounded() {
        let doc = json!({"chunk": "t", "@search.rerankerScore": 2.345_678});
        let entry = format_chunk(&doc);
        assert_eq!(entry["relevance"], 2.35);
    }

    #[test]
    fn low_confidence_answers_are_dropped() {
        let answers = vec![
            json!({"text": "good", "score": 0.9}),
            json!({"text": "bad", "score": 0.3}),
            json!({"text": "boundary", "score": 0.5}),
        ];
        let formatted = format_answers(&answers);
        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0]["text"], "good");
        assert_eq!(formatted[0]["confidence"], 0.9);
    }
}
