use std::sync::Arc;

use crate::{
    error::{AnalystError, Result},
    indicators::IndicatorKind,
    models::PriceSeries,
};

/// Per-user dashboard state passed explicitly to every action.
///
/// The held series is only ever replaced wholesale, never edited in place.
#[derive(Debug, Clone)]
pub struct Session {
    series: Option<Arc<PriceSeries>>,
    selection: Vec<IndicatorKind>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            series: None,
            selection: vec![IndicatorKind::Sma20],
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self) -> Option<&Arc<PriceSeries>> {
        self.series.as_ref()
    }

    /// The held series, or `InvalidInput` when nothing has been fetched yet.
    pub fn require_series(&self) -> Result<Arc<PriceSeries>> {
        self.series.clone().ok_or_else(|| AnalystError::InvalidInput(
            "no price data loaded, fetch a symbol first".to_string(),
        ))
    }

    pub fn has_series(&self) -> bool {
        self.series.is_some()
    }

    pub(crate) fn replace_series(&mut self, series: PriceSeries) -> Arc<PriceSeries> {
        let series = Arc::new(series);
        self.series = Some(Arc::clone(&series));
        series
    }

    /// Indicators used when an action does not name its own.
    pub fn selection(&self) -> &[IndicatorKind] {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Vec<IndicatorKind>) {
        self.selection = selection;
    }
}
