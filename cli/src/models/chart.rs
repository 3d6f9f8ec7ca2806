use chrono::NaiveDate;
use serde::Serialize;

use crate::indicators::IndicatorKind;

/// RGB colour of a chart element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartLayer {
    Candlestick {
        name: String,
        candles: Vec<Candle>,
    },
    Line {
        name: String,
        indicator: IndicatorKind,
        color: Rgb,
        points: Vec<(NaiveDate, f64)>,
    },
}

impl ChartLayer {
    pub fn name(&self) -> &str {
        match self {
            ChartLayer::Candlestick { name, .. } | ChartLayer::Line { name, .. } => name,
        }
    }
}

/// A candlestick base layer plus line overlays, ready for rendering.
///
/// Only [`crate::chart::ChartBuilder`] constructs these; once built the chart
/// is read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub(crate) title: String,
    pub(crate) layers: Vec<ChartLayer>,
    pub(crate) range_slider: bool,
}

impl ChartSpec {
    pub(crate) fn empty(title: String) -> Self {
        Self {
            title,
            layers: Vec::new(),
            range_slider: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn layers(&self) -> &[ChartLayer] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn has_range_slider(&self) -> bool {
        self.range_slider
    }

    pub fn candles(&self) -> &[Candle] {
        self.layers
            .iter()
            .find_map(|layer| match layer {
                ChartLayer::Candlestick { candles, .. } => Some(candles.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn overlays(&self) -> impl Iterator<Item = &ChartLayer> {
        self.layers
            .iter()
            .filter(|layer| matches!(layer, ChartLayer::Line { .. }))
    }

    /// Lowest and highest price across candles and overlays.
    pub fn price_bounds(&self) -> Option<(f64, f64)> {
        let candle_prices = self.candles().iter().flat_map(|c| [c.low, c.high]);
        let overlay_prices = self.overlays().flat_map(|layer| match layer {
            ChartLayer::Line { points, .. } => points.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
            _ => Vec::new(),
        });

        candle_prices
            .chain(overlay_prices)
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }
}
