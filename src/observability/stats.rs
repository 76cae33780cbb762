//! Per-route request statistics.
//!
//! Updated exactly once per completed request, after the response has been
//! handed back, so durations reflect end-to-end handling time. Keys are
//! normalized route patterns; per-resource paths collapse into one entry, so
//! the table stays bounded no matter what traffic looks like.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde::Serialize;

/// Distinct caller ids tracked per route before lumping into `<other>`.
const MAX_CALLERS_PER_ROUTE: usize = 32;

const OVERFLOW_CALLER: &str = "<other>";
const UNMATCHED_ROUTE: &str = "<unmatched>";

/// Replace variable path segments with a fixed placeholder.
///
/// Must be applied before [`StatsAggregator::record`]; anything that is not
/// a declared route collapses into a single key so adversarial paths cannot
/// grow the table.
pub fn normalize_route(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/stats" => "/stats",
        "/mcp" => "/mcp",
        "/api/drugs/search" => "/api/drugs/search",
        "/api/documents/search" => "/api/documents/search",
        "/api/pharmacies/search" => "/api/pharmacies/search",
        p if p.strip_prefix("/api/drugs/")
            .is_some_and(|rest| !rest.is_empty() && !rest.contains('/')) =>
        {
            "/api/drugs/:kod"
        }
        p if p.strip_prefix("/api/pharmacies/")
            .is_some_and(|rest| !rest.is_empty() && !rest.contains('/')) =>
        {
            "/api/pharmacies/:kodPracoviste"
        }
        _ => UNMATCHED_ROUTE,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DurationStats {
    pub count: u64,
    pub sum_ms: u64,
    pub avg_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteStats {
    pub total: u64,
    /// Requests by status class ("2xx", "3xx", "4xx", "5xx").
    pub status_classes: BTreeMap<String, u64>,
    /// Requests by caller id, capped at [`MAX_CALLERS_PER_ROUTE`] keys.
    pub callers: BTreeMap<String, u64>,
    #[serde(skip)]
    duration_sum_ms: u64,
    #[serde(skip)]
    duration_min_ms: u64,
    #[serde(skip)]
    duration_max_ms: u64,
}

impl RouteStats {
    fn record(&mut self, duration_ms: u64, status: u16, caller_id: &str) {
        self.total += 1;

        let class = match status {
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };
        *self.status_classes.entry(class.to_string()).or_default() += 1;

        let caller_key = if self.callers.contains_key(caller_id)
            || self.callers.len() < MAX_CALLERS_PER_ROUTE
        {
            caller_id
        } else {
            OVERFLOW_CALLER
        };
        *self.callers.entry(caller_key.to_string()).or_default() += 1;

        self.duration_sum_ms += duration_ms;
        self.duration_max_ms = self.duration_max_ms.max(duration_ms);
        self.duration_min_ms = if self.total == 1 {
            duration_ms
        } else {
            self.duration_min_ms.min(duration_ms)
        };
    }

    fn durations(&self) -> DurationStats {
        DurationStats {
            count: self.total,
            sum_ms: self.duration_sum_ms,
            avg_ms: if self.total == 0 { 0 } else { self.duration_sum_ms / self.total },
            min_ms: self.duration_min_ms,
            max_ms: self.duration_max_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSnapshot {
    pub route: String,
    pub total: u64,
    pub status_classes: BTreeMap<String, u64>,
    pub callers: BTreeMap<String, u64>,
    pub duration_ms: DurationStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub per_route: Vec<RouteSnapshot>,
}

/// Process-wide request statistics table.
#[derive(Default)]
pub struct StatsAggregator {
    entries: Mutex<HashMap<String, RouteStats>>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request under an already-normalized route key.
    pub fn record(&self, route: &str, duration_ms: u64, status: u16, caller_id: &str) {
        let mut entries = self.entries.lock().expect("stats mutex poisoned");
        entries
            .entry(route.to_string())
            .or_default()
            .record(duration_ms, status, caller_id);
    }

    /// Read-only deep copy of every accumulated entry, sorted by route.
    pub fn snapshot(&self) -> StatsSnapshot {
        let entries = self.entries.lock().expect("stats mutex poisoned");
        let mut per_route: Vec<RouteSnapshot> = entries
            .iter()
            .map(|(route, stats)| RouteSnapshot {
                route: route.clone(),
                total: stats.total,
                status_classes: stats.status_classes.clone(),
                callers: stats.callers.clone(),
                duration_ms: stats.durations(),
            })
            .collect();
        per_route.sort_by(|a, b| a.route.cmp(&b.route));
        StatsSnapshot { per_route }
    }
}
