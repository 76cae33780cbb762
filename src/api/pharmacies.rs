//! Pharmacy search and detail lookup by workplace code.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::drugs::clamp_max_results;
use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::upstream::{SearchClient, SearchQuery};

pub const INDEX: &str = "sukl-pharmacies";
const SEMANTIC_CONFIG: &str = "sukl-pharmacies-semantic";

/// Fields returned in search results (compact).
const SEARCH_FIELDS: [&str; 10] = [
    "kodPracoviste",
    "nazev",
    "adresa",
    "mesto",
    "psc",
    "telefon",
    "typLekarnyNazev",
    "pohotovost",
    "zasilkovyProdej",
    "lekarnik",
];

/// All fields for the detail view.
const DETAIL_FIELDS: [&str; 18] = [
    "kodPracoviste",
    "kodLekarny",
    "icz",
    "ico",
    "nazev",
    "ulice",
    "mesto",
    "psc",
    "adresa",
    "lekarnik",
    "www",
    "email",
    "telefon",
    "typLekarnyNazev",
    "zasilkovyProdej",
    "pohotovost",
    "pracovniDoba",
    "popisek",
];

const MAX_RESULTS_CEILING: usize = 50;
const DEFAULT_RESULTS: usize = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PharmacySearchParams {
    pub q: Option<String>,
    pub city: Option<String>,
    pub emergency: Option<bool>,
    #[serde(rename = "mailOrder")]
    pub mail_order: Option<bool>,
    #[serde(rename = "type")]
    pub pharmacy_type: Option<String>,
    #[serde(rename = "postalCode")]
    pub postal_code: Option<String>,
    #[serde(rename = "maxResults")]
    pub max_results: Option<usize>,
}

impl PharmacySearchParams {
    fn has_criterion(&self) -> bool {
        self.q.as_deref().is_some_and(|q| !q.trim().is_empty())
            || self.city.is_some()
            || self.emergency.is_some()
            || self.mail_order.is_some()
            || self.pharmacy_type.is_some()
            || self.postal_code.is_some()
    }
}

/// `GET /api/pharmacies/search`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<PharmacySearchParams>,
) -> Result<Json<Value>, GatewayError> {
    search_pharmacies(&state.search, &params).await.map(Json)
}

/// `GET /api/pharmacies/{kodPracoviste}`
pub async fn detail(
    State(state): State<AppState>,
    Path(kod): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    pharmacy_detail(&state.search, &kod).await.map(Json)
}

/// Search pharmacies with simple parameters. Shared by REST and protocol
/// tools.
pub async fn search_pharmacies(
    search: &SearchClient,
    params: &PharmacySearchParams,
) -> Result<Value, GatewayError> {
    if !params.has_criterion() {
        return Err(GatewayError::Validation(
            "Zadejte alespoň jeden parametr: q, city, emergency, mailOrder, type, nebo postalCode."
                .to_string(),
        ));
    }
    let top = clamp_max_results(params.max_results, DEFAULT_RESULTS, MAX_RESULTS_CEILING)?;

    // Pure filter queries match everything; semantic ranking only makes
    // sense with free text.
    let free_text = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let query = SearchQuery {
        search: free_text.unwrap_or("*").to_string(),
        filter: build_pharmacy_filters(params),
        select: Some(SEARCH_FIELDS.to_vec()),
        top,
        semantic_config: free_text.map(|_| SEMANTIC_CONFIG),
    };
    let result = search.search(INDEX, &query).await?;

    let pharmacies: Vec<Value> = result
        .get("value")
        .and_then(Value::as_array)
        .map(|docs| docs.iter().map(format_pharmacy_summary).collect())
        .unwrap_or_default();

    Ok(json!({
        "total": result.get("@odata.count").and_then(Value::as_u64).unwrap_or(pharmacies.len() as u64),
        "pharmacies": pharmacies,
    }))
}

/// Full pharmacy detail by workplace code. Shared by REST and protocol
/// tools.
pub async fn pharmacy_detail(search: &SearchClient, kod: &str) -> Result<Value, GatewayError> {
    let key = kod.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_digit()) {
        return Err(GatewayError::Validation(
            "Kód pracoviště musí být číslo.".to_string(),
        ));
    }
    let doc = search
        .get_document(INDEX, key, &DETAIL_FIELDS)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("Lékárna s kódem {kod} nebyla nalezena.")))?;
    Ok(format_pharmacy_detail(&doc))
}

/// Pharmacy type mapping: friendly name → SÚKL code.
/// Z = lékárna, NO = nemocniční oddělení, V = výdejna.
fn pharmacy_type_code(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "pharmacy" => Some("Z"),
        "hospital" => Some("NO"),
        "outlet" => Some("V"),
        _ => None,
    }
}

fn build_pharmacy_filters(params: &PharmacySearchParams) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(city) = &params.city {
        let safe = city.replace('\'', "''");
        parts.push(format!("mesto eq '{safe}'"));
    }

    if let Some(emergency) = params.emergency {
        parts.push(format!("pohotovost eq {emergency}"));
    }

    if let Some(mail_order) = params.mail_order {
        parts.push(format!("zasilkovyProdej eq {mail_order}"));
    }

    if let Some(name) = &params.pharmacy_type {
        if let Some(code) = pharmacy_type_code(name) {
            parts.push(format!("typLekarny eq '{code}'"));
        }
    }

    if let Some(psc) = &params.postal_code {
        let safe = psc.replace('\'', "''");
        parts.push(format!("psc eq '{}'", safe.trim()));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" and "))
    }
}

fn str_field(doc: &Value, key: &str) -> String {
    doc.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn flag_label(doc: &Value, key: &str) -> &'static str {
    if doc.get(key).and_then(Value::as_bool).unwrap_or(false) {
        "ano"
    } else {
        "ne"
    }
}

fn format_pharmacy_summary(doc: &Value) -> Value {
    json!({
        "kodPracoviste": str_field(doc, "kodPracoviste"),
        "nazev": str_field(doc, "nazev"),
        "adresa": str_field(doc, "adresa"),
        "mesto": str_field(doc, "mesto"),
        "psc": str_field(doc, "psc"),
        "telefon": str_field(doc, "telefon"),
        "typ": str_field(doc, "typLekarnyNazev"),
        "pohotovost": flag_label(doc, "pohotovost"),
        "zasilkovyProdej": flag_label(doc, "zasilkovyProdej"),
        "lekarnik": str_field(doc, "lekarnik"),
    })
}

fn format_pharmacy_detail(doc: &Value) -> Value {
    json!({
        "kodPracoviste": str_field(doc, "kodPracoviste"),
        "kodLekarny": str_field(doc, "kodLekarny"),
        "icz": str_field(doc, "icz"),
        "ico": str_field(doc, "ico"),
        "nazev": str_field(doc, "nazev"),
        "ulice": str_field(doc, "ulice"),
        "mesto": str_field(doc, "mesto"),
        "psc": str_field(doc, "psc"),
        "adresa": str_field(doc, "adresa"),
        "lekarnik": str_field(doc, "lekarnik"),
        "www": str_field(doc, "www"),
        "email": str_field(doc, "email"),
        "telefon": str_field(doc, "telefon"),
        "typ": str_field(doc, "typLekarnyNazev"),
        "pohotovost": flag_label(doc, "pohotovost"),
        "zasilkovyProdej": flag_label(doc, "zasilkovyProdej"),
        "pracovniDoba": str_field(doc, "pracovniDoba"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_criteria_is_rejected() {
        let params = PharmacySearchParams::default();
        assert!(!params.has_criterion());

        let blank_q = PharmacySearchParams {
            q: Some("   ".into()),
            ..Default::default()
        };
        assert!(!blank_q.has_criterion());
    }

    #[test]
    fn any_single_criterion_suffices() {
        let by_city = PharmacySearchParams {
            city: Some("Brno".into()),
            ..Default::default()
        };
        assert!(by_city.has_criterion());

        let by_flag = PharmacySearchParams {
            emergency: Some(true),
            ..Default::default()
        };
        assert!(by_flag.has_criterion());
    }

    #[test]
    fn city_quotes_are_escaped() {
        let params = PharmacySearchParams {
            city: Some("Kostelec n'Orlicí".into()),
            ..Default::default()
        };
        assert_eq!(
            build_pharmacy_filters(&params).unwrap(),
            "mesto eq 'Kostelec n''Orlicí'"
        );
    }

    #[test]
    fn known_type_maps_to_sukl_code() {
        let params = PharmacySearchParams {
            pharmacy_type: Some("Hospital".into()),
            ..Default::default()
        };
        assert_eq!(build_pharmacy_filters(&params).unwrap(), "typLekarny eq 'NO'");
    }

    #[test]
    fn unknown_type_adds_no_filter() {
        let params = PharmacySearchParams {
            pharmacy_type: Some("drive-through".into()),
            ..Default::default()
        };
        assert!(build_pharmacy_filters(&params).is_none());
    }

    #[test]
    fn filters_combine_with_and() {
        let params = PharmacySearchParams {
            emergency: Some(true),
            mail_order: Some(false),
            postal_code: Some("602 00".into()),
            ..Default::default()
        };
        assert_eq!(
            build_pharmacy_filters(&params).unwrap(),
            "pohotovost eq true and zasilkovyProdej eq false and psc eq '602 00'"
        );
    }

    #[test]
    fn summary_renders_boolean_flags_in_czech() {
        let doc = json!({
            "kodPracoviste": "123456",
            "nazev": "Lékárna U Anděla",
            "pohotovost": true,
            "zasilkovyProdej": false,
        });
        let summary = format_pharmacy_summary(&doc);
        assert_eq!(summary["pohotovost"], "ano");
        assert_eq!(summary["zasilkovyProdej"], "ne");
        assert_eq!(summary["nazev"], "Lékárna U Anděla");
    }

    #[tokio::test]
    async fn non_numeric_workplace_code_is_rejected_before_any_upstream_call() {
        use crate::config::schema::UpstreamConfig;
        use crate::upstream::RateLimiter;
        use std::time::Duration;

        let config = UpstreamConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: String::new(),
        };
        let client = SearchClient::new(&config, RateLimiter::new(1, Duration::from_secs(1))).unwrap();
        let err = pharmacy_detail(&client, "12ab56").await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }
}
