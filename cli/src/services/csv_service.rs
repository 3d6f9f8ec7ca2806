use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::{
    error::{AnalystError, Result},
    models::{DateRange, PriceObservation, PriceSeries, RawPriceRecord},
    services::MarketDataSource,
    utils::{format_date_range_info, log_fetch, Logger, Timer},
};

/// Daily bars from local `<SYMBOL>.csv` files.
///
/// Expected header: `date,open,high,low,close,volume` with `YYYY-MM-DD`
/// dates. A missing file means the symbol has no data.
pub struct CsvDirectorySource {
    data_dir: PathBuf,
    logger: Logger,
}

impl CsvDirectorySource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let logger = Logger::new("CSV_SOURCE");
        logger.debug(&format!("Reading price files from {}", data_dir.display()));
        Self { data_dir, logger }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn file_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", symbol))
    }
}

#[async_trait]
impl MarketDataSource for CsvDirectorySource {
    fn name(&self) -> &str {
        "csv"
    }

    async fn fetch(&self, symbol: &str, range: DateRange) -> Result<PriceSeries> {
        let timer = Timer::start(&format!("{} csv load", symbol));
        let path = self.file_for(symbol);
        log_fetch(&format!("Loading {} {}", path.display(), format_date_range_info(&range)));

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.logger.warn(&format!("No price file for {}", symbol));
                return Ok(PriceSeries::empty(symbol, range));
            }
            Err(e) => {
                return Err(AnalystError::MarketData(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let rows = parse_csv_content(&content)
            .map_err(|e| AnalystError::MarketData(format!("{}: {}", path.display(), e)))?;
        let series = PriceSeries::from_unsorted(symbol, range, rows);

        self.logger.info(&format!(
            "{}: {} rows in range ({:.1}ms)",
            symbol,
            series.len(),
            timer.elapsed_ms()
        ));
        Ok(series)
    }
}

/// Parse price CSV content into observations (unsorted, unfiltered).
pub fn parse_csv_content(content: &str) -> anyhow::Result<Vec<PriceObservation>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut observations = Vec::new();
    for result in reader.deserialize() {
        let raw: RawPriceRecord = result?;
        observations.push(raw.to_observation()?);
    }
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = "date,open,high,low,close,volume\n\
        2024-01-03,184.22,185.88,183.43,184.25,58414500\n\
        2024-01-02,187.15,188.44,183.89,185.64,82488700\n\
        2023-12-29,193.90,194.40,191.73,192.53,42628800\n";

    fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sorts_and_filters_rows() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AAPL.csv"), SAMPLE).unwrap();

        let source = CsvDirectorySource::new(dir.path());
        let series = source.fetch("AAPL", january()).await.unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![185.64, 184.25]);
    }

    #[tokio::test]
    async fn test_missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvDirectorySource::new(dir.path());
        let series = source.fetch("MSFT", january()).await.unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_parse_rejects_infinite_prices() {
        let content = "date,open,high,low,close,volume\n2024-01-02,10,inf,9,10,5\n";
        assert!(parse_csv_content(content).is_err());
    }

    #[tokio::test]
    async fn test_nan_price_file_is_market_data_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("NAN.csv"), "date,open,high,low,close,volume\n2024-01-02,10,11,9,NaN,5\n").unwrap();

        let source = CsvDirectorySource::new(dir.path());
        let result = source.fetch("NAN", january()).await;
        assert!(matches!(result, Err(AnalystError::MarketData(_))));
    }

    #[tokio::test]
    async fn test_malformed_file_is_market_data_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BAD.csv"), "date,open\n2024-01-02,abc\n").unwrap();

        let source = CsvDirectorySource::new(dir.path());
        let result = source.fetch("BAD", january()).await;
        assert!(matches!(result, Err(AnalystError::MarketData(_))));
    }
}
