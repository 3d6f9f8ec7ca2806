//! Technical indicators computed from a [`PriceSeries`].

pub mod math;

use crate::{
    error::{AnalystError, Result},
    models::PriceSeries,
    utils::Logger,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Window shared by every indicator on the dashboard.
pub const WINDOW: usize = 20;

/// Band width, in standard deviations, for Bollinger Bands.
pub const BOLLINGER_K: f64 = 2.0;

/// The indicators a user can overlay on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma20,
    Ema20,
    Bollinger20,
    Vwap,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 4] = [
        IndicatorKind::Sma20,
        IndicatorKind::Ema20,
        IndicatorKind::Bollinger20,
        IndicatorKind::Vwap,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            IndicatorKind::Sma20 => "sma20",
            IndicatorKind::Ema20 => "ema20",
            IndicatorKind::Bollinger20 => "bollinger20",
            IndicatorKind::Vwap => "vwap",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IndicatorKind::Sma20 => "SMA(20)",
            IndicatorKind::Ema20 => "EMA(20)",
            IndicatorKind::Bollinger20 => "Bollinger Bands(20)",
            IndicatorKind::Vwap => "VWAP",
        }
    }

    /// Look-back window of the formula; VWAP is cumulative and has none.
    pub fn window(&self) -> Option<usize> {
        match self {
            IndicatorKind::Sma20 | IndicatorKind::Ema20 | IndicatorKind::Bollinger20 => Some(WINDOW),
            IndicatorKind::Vwap => None,
        }
    }

    /// Fewest observations the series must hold before computing.
    pub fn min_observations(&self) -> usize {
        match self {
            IndicatorKind::Sma20 | IndicatorKind::Bollinger20 => WINDOW,
            IndicatorKind::Ema20 | IndicatorKind::Vwap => 1,
        }
    }

    /// First index whose value can be read as settled. EMA is defined from
    /// the first bar but carries its seed until a full window has passed.
    pub fn stable_from(&self) -> usize {
        self.window().map_or(0, |w| w - 1)
    }

    pub fn compute(&self, series: &PriceSeries) -> Result<Vec<IndicatorSeries>> {
        let available = series.len();
        let required = self.min_observations();
        if available < required {
            return Err(AnalystError::InsufficientData {
                indicator: self.display_name().to_string(),
                required,
                available,
            });
        }

        let dates = series.dates();
        let closes = series.closes();

        let output = match self {
            IndicatorKind::Sma20 => vec![IndicatorSeries::from_values(
                *self,
                "SMA(20)",
                &dates,
                math::rolling_mean(&closes, WINDOW),
            )],
            IndicatorKind::Ema20 => vec![IndicatorSeries::from_values(
                *self,
                "EMA(20)",
                &dates,
                math::ema(&closes, WINDOW).into_iter().map(Some).collect(),
            )],
            IndicatorKind::Bollinger20 => {
                let (upper, lower) = bollinger_bands(&closes, WINDOW, BOLLINGER_K);
                vec![
                    IndicatorSeries::from_values(*self, "Bollinger Upper(20)", &dates, upper),
                    IndicatorSeries::from_values(*self, "Bollinger Lower(20)", &dates, lower),
                ]
            }
            IndicatorKind::Vwap => {
                let values = math::cumulative_vwap(&closes, &series.volumes());
                let undefined = values.iter().filter(|v| v.is_none()).count();
                if undefined > 0 {
                    Logger::new("INDICATORS").warn(&format!(
                        "VWAP undefined for {} leading point(s) of {}: cumulative volume is zero",
                        undefined,
                        series.symbol()
                    ));
                }
                vec![IndicatorSeries::from_values(*self, "VWAP", &dates, values)]
            }
        };

        Ok(output)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for IndicatorKind {
    type Err = AnalystError;

    /// Accepts ids (`sma20`), display names (`SMA(20)`) and the original
    /// dashboard labels (`20-Day SMA`), ignoring case, spaces and punctuation.
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "sma" | "sma20" | "20daysma" => Ok(IndicatorKind::Sma20),
            "ema" | "ema20" | "20dayema" => Ok(IndicatorKind::Ema20),
            "bb" | "bb20" | "bollinger" | "bollinger20" | "bollingerbands"
            | "bollingerbands20" | "20daybollingerbands" => Ok(IndicatorKind::Bollinger20),
            "vwap" => Ok(IndicatorKind::Vwap),
            _ => Err(AnalystError::InvalidInput(format!("unknown indicator '{}'", s))),
        }
    }
}

/// Parse a comma-separated indicator selection such as `"sma20, vwap"`.
pub fn parse_selection(input: &str) -> Result<Vec<IndicatorKind>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(IndicatorKind::from_str)
        .collect()
}

fn bollinger_bands(closes: &[f64], window: usize, k: f64) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let middle = math::rolling_mean(closes, window);
    let sigma = math::rolling_sample_std(closes, window);

    middle
        .iter()
        .zip(&sigma)
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => (Some(m + k * s), Some(m - k * s)),
            _ => (None, None),
        })
        .unzip()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// A named derived series, one point per price date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub name: String,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    fn from_values(kind: IndicatorKind, name: &str, dates: &[NaiveDate], values: Vec<Option<f64>>) -> Self {
        let points = dates
            .iter()
            .zip(values)
            .map(|(&date, value)| IndicatorPoint { date, value })
            .collect();

        Self {
            kind,
            name: name.to_string(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Raw values, `None` where undefined.
    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Only the defined `(date, value)` pairs.
    pub fn defined(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().filter_map(|p| p.value.map(|v| (p.date, v)))
    }

    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.defined().last()
    }

    /// Strict access: undefined points become [`AnalystError::UndefinedValue`].
    pub fn value_at(&self, index: usize) -> Result<f64> {
        let point = self.points.get(index).ok_or_else(|| {
            AnalystError::InvalidInput(format!(
                "{} has {} points, index {} requested",
                self.name,
                self.points.len(),
                index
            ))
        })?;

        point.value.ok_or_else(|| AnalystError::UndefinedValue {
            indicator: self.name.clone(),
            date: point.date,
            reason: match self.kind {
                IndicatorKind::Vwap => "cumulative volume is zero".to_string(),
                _ => format!("fewer than {} observations in the window", WINDOW),
            },
        })
    }
}

/// The selection with repeats dropped, first occurrence kept.
pub fn unique_kinds(kinds: &[IndicatorKind]) -> Vec<IndicatorKind> {
    let mut unique = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if !unique.contains(kind) {
            unique.push(*kind);
        }
    }
    unique
}

/// Compute every selected indicator, in selection order, ignoring repeats.
pub fn compute_all(kinds: &[IndicatorKind], series: &PriceSeries) -> Result<Vec<IndicatorSeries>> {
    let mut output = Vec::new();
    for kind in unique_kinds(kinds) {
        output.extend(kind.compute(series)?);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, PriceObservation};
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn series_from(closes: &[f64], volumes: &[u64]) -> PriceSeries {
        let observations = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&c, &v))| {
                PriceObservation::new(start() + Duration::days(i as i64), c, c + 1.0, c - 1.0, c, v)
            })
            .collect();
        let range = DateRange::new(start(), start() + Duration::days(closes.len() as i64)).unwrap();
        PriceSeries::new("TEST", range, observations).unwrap()
    }

    fn wavy(n: usize) -> PriceSeries {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64 * 0.7).sin() * 8.0 + i as f64 * 0.3).collect();
        let volumes: Vec<u64> = (0..n).map(|i| 1_000 + (i as u64 * 37) % 500).collect();
        series_from(&closes, &volumes)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_short_series_rejected_for_windowed_indicators() {
        let series = wavy(19);
        for kind in [IndicatorKind::Sma20, IndicatorKind::Bollinger20] {
            match kind.compute(&series) {
                Err(AnalystError::InsufficientData { required, available, .. }) => {
                    assert_eq!(required, 20);
                    assert_eq!(available, 19);
                }
                other => panic!("expected InsufficientData, got {:?}", other),
            }
        }
        assert!(IndicatorKind::Ema20.compute(&series).is_ok());
        assert!(IndicatorKind::Vwap.compute(&series).is_ok());
    }

    #[test]
    fn test_empty_series_rejected_everywhere() {
        let series = PriceSeries::empty("TEST", DateRange::default());
        for kind in IndicatorKind::ALL {
            assert!(matches!(kind.compute(&series), Err(AnalystError::InsufficientData { .. })));
        }
    }

    #[test]
    fn test_first_sma_is_mean_of_first_twenty_closes() {
        let series = wavy(30);
        let sma = &IndicatorKind::Sma20.compute(&series).unwrap()[0];
        let closes = series.closes();

        assert_eq!(sma.len(), 30);
        assert!(sma.values()[..19].iter().all(Option::is_none));
        let expected = closes[..20].iter().sum::<f64>() / 20.0;
        assert_close(sma.value_at(19).unwrap(), expected);
    }

    #[test]
    fn test_ema_covers_every_observation() {
        let series = wavy(25);
        let ema = &IndicatorKind::Ema20.compute(&series).unwrap()[0];
        assert_eq!(ema.len(), series.len());
        assert_close(ema.value_at(0).unwrap(), series.closes()[0]);
        assert!(ema.values().iter().all(Option::is_some));
        assert_eq!(IndicatorKind::Ema20.stable_from(), 19);
    }

    #[test]
    fn test_bollinger_width_is_four_sigma() {
        let series = wavy(40);
        let bands = IndicatorKind::Bollinger20.compute(&series).unwrap();
        assert_eq!(bands.len(), 2);
        let (upper, lower) = (&bands[0], &bands[1]);
        let sigma = math::rolling_sample_std(&series.closes(), WINDOW);

        for i in 0..series.len() {
            match sigma[i] {
                Some(s) => {
                    let width = upper.value_at(i).unwrap() - lower.value_at(i).unwrap();
                    assert!((width - 4.0 * s).abs() < 1e-9, "index {}", i);
                }
                None => {
                    assert!(upper.points[i].value.is_none());
                    assert!(lower.points[i].value.is_none());
                }
            }
        }
    }

    #[test]
    fn test_vwap_stays_within_running_close_range() {
        let series = wavy(60);
        let vwap = &IndicatorKind::Vwap.compute(&series).unwrap()[0];
        let closes = series.closes();

        for i in 0..closes.len() {
            let lo = closes[..=i].iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = closes[..=i].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let v = vwap.value_at(i).unwrap();
            assert!(v >= lo - 1e-9 && v <= hi + 1e-9, "VWAP {} outside [{}, {}] at {}", v, lo, hi, i);
        }
    }

    #[test]
    fn test_vwap_zero_volume_point_is_undefined_value() {
        let series = series_from(&[10.0, 11.0, 12.0], &[0, 0, 10]);
        let vwap = &IndicatorKind::Vwap.compute(&series).unwrap()[0];
        assert!(matches!(vwap.value_at(0), Err(AnalystError::UndefinedValue { .. })));
        assert_close(vwap.value_at(2).unwrap(), 12.0);
    }

    #[test]
    fn test_constant_price_scenario() {
        let series = series_from(&[100.0; 25], &[1_000; 25]);
        let all = compute_all(&IndicatorKind::ALL, &series).unwrap();
        let by_name = |name: &str| all.iter().find(|s| s.name == name).unwrap();

        assert_close(by_name("SMA(20)").value_at(24).unwrap(), 100.0);
        assert_eq!(math::rolling_sample_std(&series.closes(), WINDOW)[24], Some(0.0));
        assert_close(by_name("Bollinger Upper(20)").value_at(24).unwrap(), 100.0);
        assert_close(by_name("Bollinger Lower(20)").value_at(24).unwrap(), 100.0);
        for i in 0..25 {
            assert_close(by_name("VWAP").value_at(i).unwrap(), 100.0);
        }
    }

    #[test]
    fn test_compute_all_dedups_in_selection_order() {
        let series = wavy(30);
        let kinds = [IndicatorKind::Vwap, IndicatorKind::Sma20, IndicatorKind::Vwap];
        let names: Vec<String> = compute_all(&kinds, &series)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["VWAP", "SMA(20)"]);
    }

    #[test]
    fn test_unique_kinds_keeps_first_occurrence() {
        use IndicatorKind::*;
        assert_eq!(unique_kinds(&[Ema20, Vwap, Ema20, Sma20, Vwap]), vec![Ema20, Vwap, Sma20]);
        assert!(unique_kinds(&[]).is_empty());
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("20-Day SMA".parse::<IndicatorKind>().unwrap(), IndicatorKind::Sma20);
        assert_eq!("EMA(20)".parse::<IndicatorKind>().unwrap(), IndicatorKind::Ema20);
        assert_eq!("20 Day Bollinger Bands".parse::<IndicatorKind>().unwrap(), IndicatorKind::Bollinger20);
        assert_eq!("bb".parse::<IndicatorKind>().unwrap(), IndicatorKind::Bollinger20);
        assert_eq!("VWAP".parse::<IndicatorKind>().unwrap(), IndicatorKind::Vwap);
        assert!("rsi14".parse::<IndicatorKind>().is_err());

        let selection = parse_selection("sma20, vwap,,").unwrap();
        assert_eq!(selection, vec![IndicatorKind::Sma20, IndicatorKind::Vwap]);
    }
}
