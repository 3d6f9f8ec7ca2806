use crate::error::{AnalystError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar.
///
/// `low <= min(open, close) <= max(open, close) <= high` is expected from the
/// data provider and is not re-checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceObservation {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// All four prices are real numbers (no NaN or infinity).
    pub fn has_finite_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close].iter().all(|p| p.is_finite())
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Closed calendar range `[start, end]` used for fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AnalystError::InvalidInput(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl Default for DateRange {
    /// The dashboard's initial date pickers: 2023-02-01 to 2024-04-03.
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2023, 2, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 4, 3).unwrap_or_default(),
        }
    }
}

/// Daily observations for one symbol over one closed date range.
///
/// Dates are strictly increasing and all fall inside the range. The series
/// is never mutated after construction; a new fetch produces a new series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    range: DateRange,
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    pub fn new(symbol: &str, range: DateRange, observations: Vec<PriceObservation>) -> Result<Self> {
        for pair in observations.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(AnalystError::InvalidInput(format!(
                    "{}: observation dates must be strictly increasing ({} follows {})",
                    symbol, pair[1].date, pair[0].date
                )));
            }
        }

        if let Some(bad) = observations.iter().find(|o| !o.has_finite_prices()) {
            return Err(AnalystError::InvalidInput(format!(
                "{}: observation {} has a non-finite price",
                symbol, bad.date
            )));
        }

        if let Some(outside) = observations.iter().find(|o| !range.contains(o.date)) {
            return Err(AnalystError::InvalidInput(format!(
                "{}: observation {} is outside {}..={}",
                symbol, outside.date, range.start, range.end
            )));
        }

        Ok(Self {
            symbol: symbol.to_string(),
            range,
            observations,
        })
    }

    /// A successful lookup that returned no rows.
    pub fn empty(symbol: &str, range: DateRange) -> Self {
        Self {
            symbol: symbol.to_string(),
            range,
            observations: Vec::new(),
        }
    }

    /// Build a series from unsorted provider rows: sorts by date, keeps the
    /// last row for duplicated dates and drops rows outside the range or
    /// with non-finite prices.
    pub fn from_unsorted(symbol: &str, range: DateRange, mut rows: Vec<PriceObservation>) -> Self {
        rows.retain(|row| range.contains(row.date) && row.has_finite_prices());
        rows.sort_by_key(|row| row.date);

        let mut observations: Vec<PriceObservation> = Vec::with_capacity(rows.len());
        for row in rows {
            match observations.last_mut() {
                Some(last) if last.date == row.date => *last = row,
                _ => observations.push(row),
            }
        }

        Self {
            symbol: symbol.to_string(),
            range,
            observations,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.close).collect()
    }

    pub fn volumes(&self) -> Vec<u64> {
        self.observations.iter().map(|o| o.volume).collect()
    }

    pub fn first(&self) -> Option<&PriceObservation> {
        self.observations.first()
    }

    pub fn last(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }
}

/// Row format of local CSV price files.
#[derive(Debug, Deserialize)]
pub struct RawPriceRecord {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl RawPriceRecord {
    pub fn to_observation(&self) -> anyhow::Result<PriceObservation> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")?;
        let observation = PriceObservation::new(date, self.open, self.high, self.low, self.close, self.volume);
        if !observation.has_finite_prices() {
            anyhow::bail!("{}: prices must be finite numbers", self.date.trim());
        }
        Ok(observation)
    }
}
