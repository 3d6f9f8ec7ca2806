use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;

use crate::{
    error::{AnalystError, Result},
    models::{DateRange, PriceObservation, PriceSeries},
    services::MarketDataSource,
    utils::{date_from_unix, format_date_range_info, log_fetch, unix_midnight, Logger, Timer},
};

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Daily bars from the Yahoo Finance chart API.
pub struct YahooFinanceSource {
    client: reqwest::Client,
    base_url: String,
    logger: Logger,
}

impl YahooFinanceSource {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            logger: Logger::new("MARKET_DATA"),
        })
    }

    fn chart_url(&self, symbol: &str, range: DateRange) -> String {
        // period2 is exclusive, so ask for one day past the end
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url,
            symbol,
            unix_midnight(range.start),
            unix_midnight(range.end + Duration::days(1))
        )
    }
}

#[async_trait]
impl MarketDataSource for YahooFinanceSource {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch(&self, symbol: &str, range: DateRange) -> Result<PriceSeries> {
        let timer = Timer::start(&format!("{} fetch", symbol));
        log_fetch(&format!("Requesting {} {}", symbol, format_date_range_info(&range)));

        let response = self
            .client
            .get(self.chart_url(symbol, range))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AnalystError::MarketData(format!("request for {} failed: {}", symbol, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalystError::MarketData(format!("reading {} response failed: {}", symbol, e)))?;

        // Unknown symbols come back as 404 with a chart error body
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(AnalystError::MarketData(format!("HTTP {} for {}", status, symbol)));
        }

        let series = parse_chart_body(symbol, range, &body)?;
        self.logger.info(&format!(
            "{}: {} daily bars in {:.1}ms",
            symbol,
            series.len(),
            timer.elapsed_ms()
        ));
        Ok(series)
    }
}

/// Convert a chart API payload into a series; rows with any null field are dropped.
fn parse_chart_body(symbol: &str, range: DateRange, body: &str) -> Result<PriceSeries> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| AnalystError::MarketData(format!("unreadable chart payload for {}: {}", symbol, e)))?;

    if let Some(error) = envelope.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Ok(PriceSeries::empty(symbol, range));
        }
        return Err(AnalystError::MarketData(format!(
            "{} for {}: {}",
            error.code, symbol, error.description
        )));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::empty(symbol, range));
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let offset = result.meta.gmtoffset;

    let rows = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date = date_from_unix(ts + offset)?;
            let open = (*quote.open.get(i)?)?;
            let high = (*quote.high.get(i)?)?;
            let low = (*quote.low.get(i)?)?;
            let close = (*quote.close.get(i)?)?;
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0.0);
            Some(PriceObservation::new(date, open, high, low, close, volume.max(0.0) as u64))
        })
        .collect();

    Ok(PriceSeries::from_unsorted(symbol, range, rows))
}
