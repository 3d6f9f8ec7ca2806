use chartanalyst::{api::Dashboard, indicators::IndicatorKind, session::Session};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

// --- Type Aliases for Shared State ---

// One dashboard session; the lock is held for the whole of each action
pub type SharedSession = Arc<Mutex<Session>>;

// Collaborators and exporter, read-only after startup
pub type SharedDashboard = Arc<Dashboard>;

// --- Request / Response Payloads ---

#[derive(Clone, Debug, Deserialize)]
pub struct FetchRequest {
    pub symbol: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// `?indicators=sma20&indicators=vwap` or `?indicators=sma20,vwap`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChartQuery {
    #[serde(default)]
    pub indicators: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub indicators: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct IndicatorInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub window: Option<usize>,
    pub min_observations: usize,
    pub selected: bool,
}

impl IndicatorInfo {
    pub fn describe(kind: IndicatorKind, selection: &[IndicatorKind]) -> Self {
        Self {
            id: kind.id(),
            name: kind.display_name(),
            window: kind.window(),
            min_observations: kind.min_observations(),
            selected: selection.contains(&kind),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub node: String,
    pub environment: String,
    pub data_source: String,
    pub model: String,
    pub loaded_symbol: Option<String>,
}
