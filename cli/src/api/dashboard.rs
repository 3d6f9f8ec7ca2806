//! The dashboard actions: fetch, render, snapshot and analyze.
//!
//! Every action takes the caller's [`Session`] explicitly and runs to
//! completion. Failed actions leave the session exactly as it was.

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    ask_ai::{run_analysis, AnalysisResponse, VisionModel},
    chart::{ChartBuilder, SnapshotExporter},
    error::{AnalystError, Result},
    indicators::{unique_kinds, IndicatorKind, IndicatorSeries},
    models::{ChartSpec, DateRange, PriceSeries},
    services::MarketDataSource,
    session::Session,
    utils::{format_date_range_info, log_render, normalize_symbol, Logger, Timer},
};

/// Outcome of a successful fetch.
#[derive(Debug, Clone, Serialize)]
pub struct FetchSummary {
    pub symbol: String,
    pub range: DateRange,
    pub observations: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub last_close: Option<f64>,
}

/// A rendered chart plus messages about overlays that could not be drawn.
#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    pub chart: ChartSpec,
    pub notices: Vec<String>,
}

/// Latest defined value of one indicator line.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorReading {
    pub kind: IndicatorKind,
    pub name: String,
    pub date: Option<NaiveDate>,
    pub value: Option<f64>,
}

/// One selected indicator after computation.
enum Overlay {
    Drawn(Vec<IndicatorSeries>),
    /// Not enough history; carries the reason.
    Skipped(IndicatorKind, String),
}

pub struct Dashboard {
    source: Box<dyn MarketDataSource>,
    model: Box<dyn VisionModel>,
    exporter: SnapshotExporter,
    logger: Logger,
}

impl Dashboard {
    pub fn new(source: Box<dyn MarketDataSource>, model: Box<dyn VisionModel>, exporter: SnapshotExporter) -> Self {
        Self {
            source,
            model,
            exporter,
            logger: Logger::new("DASHBOARD"),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Load daily prices into the session.
    ///
    /// An empty result is `NoData` and, like any error, keeps whatever
    /// series the session already held.
    pub async fn fetch(&self, session: &mut Session, symbol: &str, range: DateRange) -> Result<FetchSummary> {
        let symbol = normalize_symbol(symbol)?;
        self.logger.info(&format!(
            "Fetching {} from {} {}",
            symbol,
            self.source.name(),
            format_date_range_info(&range)
        ));

        let series = self.source.fetch(&symbol, range).await?;
        if series.is_empty() {
            self.logger.warn(&format!("{} returned no rows for {}", self.source.name(), symbol));
            return Err(AnalystError::NoData {
                symbol,
                start: range.start,
                end: range.end,
            });
        }

        let summary = FetchSummary {
            symbol: series.symbol().to_string(),
            range: series.range(),
            observations: series.len(),
            first_date: series.first().map(|o| o.date),
            last_date: series.last().map(|o| o.date),
            last_close: series.last().map(|o| o.close),
        };
        session.replace_series(series);

        self.logger.info(&format!("{} loaded with {} observations", summary.symbol, summary.observations));
        Ok(summary)
    }

    /// Compute each distinct selected indicator in order. Indicators
    /// without enough history come back as [`Overlay::Skipped`]; any other
    /// indicator error fails the whole computation.
    fn compute_overlays(&self, series: &PriceSeries, kinds: &[IndicatorKind]) -> Result<Vec<Overlay>> {
        unique_kinds(kinds)
            .into_iter()
            .map(|kind| match kind.compute(series) {
                Ok(lines) => Ok(Overlay::Drawn(lines)),
                Err(e @ AnalystError::InsufficientData { .. }) => {
                    self.logger.warn(&e.to_string());
                    Ok(Overlay::Skipped(kind, e.to_string()))
                }
                Err(e) => Err(e),
            })
            .collect()
    }

    /// Build the chart for the held series.
    ///
    /// Indicators without enough history are left off the chart and
    /// reported in `notices`; other indicator errors fail the action.
    pub fn render(&self, session: &Session, kinds: &[IndicatorKind]) -> Result<ChartView> {
        let series = session.require_series()?;
        let timer = Timer::start("chart build");

        let mut overlays: Vec<IndicatorSeries> = Vec::new();
        let mut notices = Vec::new();
        for overlay in self.compute_overlays(&series, kinds)? {
            match overlay {
                Overlay::Drawn(lines) => overlays.extend(lines),
                Overlay::Skipped(_, reason) => notices.push(reason),
            }
        }

        let chart = ChartBuilder::new(&series).with_indicators(&overlays).build();
        log_render(&format!(
            "{} with {} layers, {} notices in {:.1}ms",
            chart.title(),
            chart.layers().len(),
            notices.len(),
            timer.elapsed_ms()
        ));

        Ok(ChartView { chart, notices })
    }

    /// Export an already built chart as PNG bytes.
    pub fn export(&self, chart: &ChartSpec) -> Result<Vec<u8>> {
        self.exporter.export_png(chart)
    }

    /// Render the chart and export it as PNG bytes.
    pub fn snapshot(&self, session: &Session, kinds: &[IndicatorKind]) -> Result<Vec<u8>> {
        let view = self.render(session, kinds)?;
        self.export(&view.chart)
    }

    /// Snapshot the current chart and ask the vision model to read it.
    pub async fn analyze(&self, session: &Session, kinds: &[IndicatorKind]) -> Result<AnalysisResponse> {
        let png = self.snapshot(session, kinds)?;
        run_analysis(self.model.as_ref(), &png).await
    }

    /// Most recent defined value of each selected indicator line.
    ///
    /// An indicator without enough history yields a single reading with
    /// no date and no value, the same cases `render` turns into notices.
    pub fn latest_values(&self, session: &Session, kinds: &[IndicatorKind]) -> Result<Vec<IndicatorReading>> {
        let series = session.require_series()?;

        let mut readings = Vec::new();
        for overlay in self.compute_overlays(&series, kinds)? {
            match overlay {
                Overlay::Drawn(lines) => readings.extend(lines.iter().map(|line| {
                    let latest = line.latest();
                    IndicatorReading {
                        kind: line.kind,
                        name: line.name.clone(),
                        date: latest.map(|(d, _)| d),
                        value: latest.map(|(_, v)| v),
                    }
                })),
                Overlay::Skipped(kind, _) => readings.push(IndicatorReading {
                    kind,
                    name: kind.display_name().to_string(),
                    date: None,
                    value: None,
                }),
            }
        }
        Ok(readings)
    }
}
