//! Builder for wiring a [`Dashboard`] to its collaborators.

use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    api::dashboard::Dashboard,
    ask_ai::{OllamaClient, VisionModel, DEFAULT_OLLAMA_URL, DEFAULT_VISION_MODEL},
    chart::{Rasterizer, SnapshotExporter},
    chart::render::{DEFAULT_HEIGHT, DEFAULT_WIDTH},
    error::{AnalystError, Result},
    services::{CsvDirectorySource, MarketDataSource, YahooFinanceSource, YAHOO_BASE_URL},
};

pub const DEFAULT_MARKET_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

/// Which market-data collaborator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    #[default]
    Yahoo,
    Csv,
}

impl FromStr for DataSourceKind {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" | "yfinance" => Ok(DataSourceKind::Yahoo),
            "csv" => Ok(DataSourceKind::Csv),
            other => Err(AnalystError::InvalidInput(format!(
                "unknown data source '{}', expected yahoo or csv",
                other
            ))),
        }
    }
}

/// Fluent configuration for a [`Dashboard`].
///
/// # Example
/// ```rust,ignore
/// let dashboard = DashboardBuilder::new()
///     .with_data_source(DataSourceKind::Csv)
///     .with_csv_dir("./market_data")
///     .with_ollama_model("llava")
///     .build()?;
/// ```
pub struct DashboardBuilder {
    data_source: DataSourceKind,
    yahoo_base_url: String,
    csv_dir: PathBuf,
    market_timeout: Duration,
    ollama_url: String,
    ollama_model: String,
    model_timeout: Duration,
    chart_width: u32,
    chart_height: u32,
    work_dir: Option<PathBuf>,
    source: Option<Box<dyn MarketDataSource>>,
    model: Option<Box<dyn VisionModel>>,
}

impl Default for DashboardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardBuilder {
    pub fn new() -> Self {
        Self {
            data_source: DataSourceKind::Yahoo,
            yahoo_base_url: YAHOO_BASE_URL.to_string(),
            csv_dir: PathBuf::from("./market_data"),
            market_timeout: DEFAULT_MARKET_TIMEOUT,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: DEFAULT_VISION_MODEL.to_string(),
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            chart_width: DEFAULT_WIDTH,
            chart_height: DEFAULT_HEIGHT,
            work_dir: None,
            source: None,
            model: None,
        }
    }

    pub fn with_data_source(mut self, kind: DataSourceKind) -> Self {
        self.data_source = kind;
        self
    }

    pub fn with_yahoo_base_url(mut self, url: impl Into<String>) -> Self {
        self.yahoo_base_url = url.into();
        self
    }

    pub fn with_csv_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.csv_dir = dir.into();
        self
    }

    pub fn with_market_timeout(mut self, timeout: Duration) -> Self {
        self.market_timeout = timeout;
        self
    }

    pub fn with_ollama_url(mut self, url: impl Into<String>) -> Self {
        self.ollama_url = url.into();
        self
    }

    pub fn with_ollama_model(mut self, model: impl Into<String>) -> Self {
        self.ollama_model = model.into();
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_chart_size(mut self, width: u32, height: u32) -> Self {
        self.chart_width = width;
        self.chart_height = height;
        self
    }

    /// Directory for snapshot scratch files; the system temp dir otherwise.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Use a ready-made source instead of the configured kind.
    pub fn with_source(mut self, source: Box<dyn MarketDataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use a ready-made model instead of the Ollama client.
    pub fn with_model(mut self, model: Box<dyn VisionModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn build(self) -> Result<Dashboard> {
        let source: Box<dyn MarketDataSource> = match self.source {
            Some(source) => source,
            None => match self.data_source {
                DataSourceKind::Yahoo => Box::new(
                    YahooFinanceSource::new(&self.yahoo_base_url, self.market_timeout)
                        .map_err(|e| AnalystError::MarketData(format!("cannot build HTTP client: {}", e)))?,
                ),
                DataSourceKind::Csv => Box::new(CsvDirectorySource::new(self.csv_dir)),
            },
        };

        let model: Box<dyn VisionModel> = match self.model {
            Some(model) => model,
            None => Box::new(
                OllamaClient::new(&self.ollama_url, &self.ollama_model, self.model_timeout)
                    .map_err(|e| AnalystError::ModelUnavailable(format!("cannot build HTTP client: {}", e)))?,
            ),
        };

        let mut exporter = SnapshotExporter::new(Rasterizer::new(self.chart_width, self.chart_height)?);
        if let Some(dir) = self.work_dir {
            exporter = exporter.with_work_dir(dir);
        }

        Ok(Dashboard::new(source, model, exporter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_kind_parsing() {
        assert_eq!("Yahoo".parse::<DataSourceKind>().unwrap(), DataSourceKind::Yahoo);
        assert_eq!(" csv ".parse::<DataSourceKind>().unwrap(), DataSourceKind::Csv);
        assert!("bloomberg".parse::<DataSourceKind>().is_err());
    }

    #[test]
    fn test_build_defaults() {
        let dashboard = DashboardBuilder::new().build().unwrap();
        assert_eq!(dashboard.source_name(), "yahoo");
        assert_eq!(dashboard.model_name(), DEFAULT_VISION_MODEL);
    }

    #[test]
    fn test_build_csv_with_custom_model() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = DashboardBuilder::new()
            .with_data_source(DataSourceKind::Csv)
            .with_csv_dir(dir.path())
            .with_ollama_model("llava:13b")
            .build()
            .unwrap();
        assert_eq!(dashboard.source_name(), "csv");
        assert_eq!(dashboard.model_name(), "llava:13b");
    }

    #[test]
    fn test_invalid_chart_size_is_render_error() {
        let result = DashboardBuilder::new().with_chart_size(10, 10).build();
        assert!(matches!(result, Err(AnalystError::Render(_))));
    }
}
