//! Drug registry search and detail lookup.
//!
//! All upstream query logic lives server-side: the caller passes simple
//! parameters (`dispensing=otc`) and this module translates them into the
//! search service's filter syntax.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::upstream::{SearchClient, SearchQuery};

pub const INDEX: &str = "sukl-drugs";
const SEMANTIC_CONFIG: &str = "sukl-drugs-semantic";

/// Fields returned in search results (compact).
const SEARCH_FIELDS: [&str; 13] = [
    "kodSukl",
    "nazev",
    "sila",
    "formaNazev",
    "cestaNazev",
    "drzitelNazev",
    "atc",
    "atcNazev",
    "ucinneLatky",
    "vydejNazev",
    "indikacniSkupinaNazev",
    "dodavky",
    "doping",
];

/// All fields for the detail view.
const DETAIL_FIELDS: [&str; 27] = [
    "kodSukl",
    "nazev",
    "doplnekNazvu",
    "sila",
    "formaNazev",
    "baleni",
    "cestaNazev",
    "obalNazev",
    "drzitelNazev",
    "drzitelZeme",
    "regCislo",
    "stavRegistraceNazev",
    "atc",
    "atcNazev",
    "ucinneLatky",
    "vydejNazev",
    "dodavky",
    "indikacniSkupinaNazev",
    "doping",
    "ean",
    "datumRegistrace",
    "platnostDo",
    "spcSoubor",
    "pilSoubor",
    "slozeni",
    "synonyma",
    "popisek",
];

/// Composition text longer than this is cut in the detail view.
const MAX_SLOZENI_DETAIL: usize = 5000;

const MAX_RESULTS_CEILING: usize = 50;
const DEFAULT_RESULTS: usize = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DrugSearchParams {
    pub q: String,
    pub atc: Option<String>,
    pub holder: Option<String>,
    pub dispensing: Option<String>,
    pub doping: Option<bool>,
    pub available: Option<bool>,
    pub form: Option<String>,
    #[serde(rename = "maxResults")]
    pub max_results: Option<usize>,
}

/// `GET /api/drugs/search`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<DrugSearchParams>,
) -> Result<Json<Value>, GatewayError> {
    search_drugs(&state.search, &params).await.map(Json)
}

/// `GET /api/drugs/{kod}`
pub async fn detail(
    State(state): State<AppState>,
    Path(kod): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    drug_detail(&state.search, &kod).await.map(Json)
}

/// Search drugs with simple parameters. Shared by REST and protocol tools.
pub async fn search_drugs(
    search: &SearchClient,
    params: &DrugSearchParams,
) -> Result<Value, GatewayError> {
    if params.q.trim().is_empty() {
        return Err(GatewayError::Validation(
            "Parametr q nesmí být prázdný.".to_string(),
        ));
    }
    let top = clamp_max_results(params.max_results, DEFAULT_RESULTS, MAX_RESULTS_CEILING)?;

    let query = SearchQuery {
        search: params.q.clone(),
        filter: build_drug_filters(params),
        select: Some(SEARCH_FIELDS.to_vec()),
        top,
        semantic_config: Some(SEMANTIC_CONFIG),
    };
    let result = search.search(INDEX, &query).await?;

    let drugs: Vec<Value> = result
        .get("value")
        .and_then(Value::as_array)
        .map(|docs| docs.iter().map(format_drug_summary).collect())
        .unwrap_or_default();

    Ok(json!({
        "total": result.get("@odata.count").and_then(Value::as_u64).unwrap_or(drugs.len() as u64),
        "drugs": drugs,
    }))
}

/// Full drug detail by SÚKL code. Shared by REST and protocol tools.
pub async fn drug_detail(search: &SearchClient, kod: &str) -> Result<Value, GatewayError> {
    let key = normalize_kod(kod)?;
    let doc = search
        .get_document(INDEX, &key, &DETAIL_FIELDS)
        .await?
        .ok_or_else(|| {
            GatewayError::NotFound(format!("Léčivý přípravek s kódem {kod} nebyl nalezen."))
        })?;
    Ok(format_drug_detail(&doc))
}

/// SÚKL codes are numeric, zero-padded to 7 digits.
fn normalize_kod(kod: &str) -> Result<String, GatewayError> {
    let trimmed = kod.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(GatewayError::Validation("Kód SÚKL musí být číslo.".to_string()));
    }
    Ok(format!("{trimmed:0>7}"))
}

pub(crate) fn clamp_max_results(
    requested: Option<usize>,
    default: usize,
    ceiling: usize,
) -> Result<usize, GatewayError> {
    match requested {
        None => Ok(default),
        Some(n) if (1..=ceiling).contains(&n) => Ok(n),
        Some(n) => Err(GatewayError::Validation(format!(
            "maxResults musí být mezi 1 a {ceiling}, zadáno {n}."
        ))),
    }
}

/// Dispensing mode mapping: friendly name → SÚKL code.
/// R = na lékařský předpis, F = volně prodejné, V = vyhrazená léčiva,
/// L = s omezením (§ 39), P = bez předpisu s omezením (RLPO).
fn dispensing_code(mode: &str) -> Option<&'static str> {
    match mode.to_ascii_lowercase().as_str() {
        "prescription" => Some("R"),
        "otc" => Some("F"),
        "restricted" => Some("L"),
        "reserved" => Some("V"),
        "otc-restricted" => Some("P"),
        _ => None,
    }
}

/// Build the upstream `$filter` string from simple parameters.
///
/// The caller passes e.g. `dispensing=otc` and we translate to
/// `vydej eq 'F'` — the filter syntax never leaks out.
fn build_drug_filters(params: &DrugSearchParams) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(atc) = &params.atc {
        let atc = atc.trim().to_ascii_uppercase();
        if !atc.is_empty() && atc.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            if atc.len() < 7 {
                // Full ATC codes are 7 chars; shorter means prefix search.
                parts.push(format!("search.ismatch('{atc}*', 'atc')"));
            } else {
                parts.push(format!("atc eq '{atc}'"));
            }
        }
        // Invalid ATC is ignored: no filter added.
    }

    if let Some(holder) = &params.holder {
        let safe = holder.replace('\'', "''");
        parts.push(format!("search.ismatch('{safe}', 'drzitelNazev')"));
    }

    if let Some(mode) = &params.dispensing {
        if let Some(code) = dispensing_code(mode) {
            parts.push(format!("vydej eq '{code}'"));
        }
    }

    if let Some(doping) = params.doping {
        parts.push(format!("doping eq {doping}"));
    }

    if let Some(available) = params.available {
        parts.push(format!("dodavky eq '{}'", if available { "1" } else { "0" }));
    }

    if let Some(form) = &params.form {
        let safe = form.replace('\'', "''");
        parts.push(format!("search.ismatch('{safe}', 'formaNazev')"));
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

fn dodavky_label(doc: &Value) -> &'static str {
    if doc.get("dodavky").and_then(Value::as_str) == Some("1") {
        "ano"
    } else {
        "ne"
    }
}

/// Compact formatting for search results — no huge fields.
fn format_drug_summary(doc: &Value) -> Value {
    json!({
        "kodSukl": str_field(doc, "kodSukl"),
        "nazev": str_field(doc, "nazev"),
        "sila": str_field(doc, "sila"),
        "forma": str_field(doc, "formaNazev"),
        "cesta": str_field(doc, "cestaNazev"),
        "drzitel": str_field(doc, "drzitelNazev"),
        "atc": str_field(doc, "atc"),
        "atcNazev": str_field(doc, "atcNazev"),
        "ucinneLatky": str_field(doc, "ucinneLatky"),
        "vydej": str_field(doc, "vydejNazev"),
        "indikace": str_field(doc, "indikacniSkupinaNazev"),
        "dodavky": dodavky_label(doc),
        "doping": doc.get("doping").and_then(Value::as_bool).unwrap_or(false),
    })
}

/// Full detail formatting — clean field names, human-readable values.
fn format_drug_detail(doc: &Value) -> Value {
    let mut slozeni = str_field(doc, "slozeni");
    if slozeni.chars().count() > MAX_SLOZENI_DETAIL {
        slozeni = slozeni.chars().take(MAX_SLOZENI_DETAIL).collect();
        slozeni.push_str(" … (zkráceno)");
    }

    let kod = str_field(doc, "kodSukl");
    let sukl_url = if kod.is_empty() {
        Value::Null
    } else {
        json!(format!("https://prehledy.sukl.cz/prehled_leciv.html#/leciva/{kod}"))
    };

    json!({
        "kodSukl": kod,
        "nazev": str_field(doc, "nazev"),
        "doplnekNazvu": str_field(doc, "doplnekNazvu"),
        "sila": str_field(doc, "sila"),
        "forma": str_field(doc, "formaNazev"),
        "baleni": str_field(doc, "baleni"),
        "cesta": str_field(doc, "cestaNazev"),
        "obal": str_field(doc, "obalNazev"),
        "drzitel": str_field(doc, "drzitelNazev"),
        "drzitelZeme": str_field(doc, "drzitelZeme"),
        "regCislo": str_field(doc, "regCislo"),
        "stavRegistrace": str_field(doc, "stavRegistraceNazev"),
        "atc": str_field(doc, "atc"),
        "atcNazev": str_field(doc, "atcNazev"),
        "ucinneLatky": str_field(doc, "ucinneLatky"),
        "vydej": str_field(doc, "vydejNazev"),
        "dodavky": dodavky_label(doc),
        "indikace": str_field(doc, "indikacniSkupinaNazev"),
        "doping": doc.get("doping").and_then(Value::as_bool).unwrap_or(false),
        "ean": str_field(doc, "ean"),
        "datumRegistrace": str_field(doc, "datumRegistrace"),
        "platnostDo": str_field(doc, "platnostDo"),
        "suklUrl": sukl_url,
        "slozeni": slozeni,
        "synonyma": str_field(doc, "synonyma"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kod_is_zero_padded_to_seven_digits() {
        assert_eq!(normalize_kod("123").unwrap(), "0000123");
        assert_eq!(normalize_kod("0254045").unwrap(), "0254045");
        assert_eq!(normalize_kod(" 42 ").unwrap(), "0000042");
    }

    #[test]
    fn non_numeric_kod_is_rejected() {
        assert!(normalize_kod("abc").is_err());
        assert!(normalize_kod("12a4").is_err());
        assert!(normalize_kod("").is_err());
    }

    #[test]
    fn max_results_clamped_to_range() {
        assert_eq!(clamp_max_results(None, 10, 50).unwrap(), 10);
        assert_eq!(clamp_max_results(Some(50), 10, 50).unwrap(), 50);
        assert!(clamp_max_results(Some(0), 10, 50).is_err());
        assert!(clamp_max_results(Some(51), 10, 50).is_err());
    }

    #[test]
    fn full_atc_code_becomes_exact_filter() {
        let params = DrugSearchParams {
            atc: Some("n02be01".into()),
            ..Default::default()
        };
        assert_eq!(build_drug_filters(&params).unwrap(), "atc eq 'N02BE01'");
    }

    #[test]
    fn short_atc_code_becomes_prefix_filter() {
        let params = DrugSearchParams {
            atc: Some("N02".into()),
            ..Default::default()
        };
        assert_eq!(
            build_drug_filters(&params).unwrap(),
            "search.ismatch('N02*', 'atc')"
        );
    }

    #[test]
    fn invalid_atc_adds_no_filter() {
        let params = DrugSearchParams {
            atc: Some("N02-BE".into()),
            ..Default::default()
        };
        assert!(build_drug_filters(&params).is_none());
    }

    #[test]
    fn holder_quotes_are_escaped() {
        let params = DrugSearchParams {
            holder: Some("L'Oréal".into()),
            ..Default::default()
        };
        assert_eq!(
            build_drug_filters(&params).unwrap(),
            "search.ismatch('L''Oréal', 'drzitelNazev')"
        );
    }

    #[test]
    fn filters_combine_with_and() {
        let params = DrugSearchParams {
            dispensing: Some("otc".into()),
            available: Some(true),
            doping: Some(false),
            ..Default::default()
        };
        assert_eq!(
            build_drug_filters(&params).unwrap(),
            "vydej eq 'F' and doping eq false and dodavky eq '1'"
        );
    }

    #[test]
    fn unknown_dispensing_mode_is_ignored() {
        let params = DrugSearchParams {
            dispensing: Some("mail-order".into()),
            ..Default::default()
        };
        assert!(build_drug_filters(&params).is_none());
    }

    #[test]
    fn summary_formatting_maps_delivery_flag() {
        let doc = json!({"kodSukl": "0000001", "nazev": "PARALEN", "dodavky": "1", "doping": false});
        let summary = format_drug_summary(&doc);
        assert_eq!(summary["dodavky"], "ano");
        assert_eq!(summary["nazev"], "PARALEN");
        assert_eq!(summary["doping"], false);
    }

    #[test]
    fn detail_truncates_very_long_composition() {
        let doc = json!({"kodSukl": "0000001", "slozeni": "x".repeat(6000)});
        let detail = format_drug_detail(&doc);
        let slozeni = detail["slozeni"].as_str().unwrap();
        assert!(slozeni.ends_with("… (zkráceno)"));
        assert!(slozeni.chars().count() < 6000);
    }

    #[test]
    fn detail_links_to_public_registry() {
        let doc = json!({"kodSukl": "0254045"});
        let detail = format_drug_detail(&doc);
        assert_eq!(
            detail["suklUrl"],
            "https://prehledy.sukl.cz/prehled_leciv.html#/leciva/0254045"
        );
    }
}
