//! Assemble a [`ChartSpec`] from prices and indicator outputs.

use crate::{
    indicators::{IndicatorKind, IndicatorSeries},
    models::{Candle, ChartLayer, ChartSpec, PriceSeries, Rgb},
};

/// Overlay colours, assigned in the order overlays are added.
pub const OVERLAY_PALETTE: [Rgb; 6] = [
    Rgb(255, 165, 0),
    Rgb(30, 144, 255),
    Rgb(186, 85, 211),
    Rgb(218, 165, 32),
    Rgb(0, 191, 191),
    Rgb(220, 20, 60),
];

/// Fluent builder for a candlestick chart with indicator overlays.
///
/// # Example
/// ```rust,ignore
/// let spec = ChartBuilder::new(&series)
///     .with_indicators(&overlays)
///     .build();
/// ```
pub struct ChartBuilder<'a> {
    series: &'a PriceSeries,
    indicators: Vec<&'a IndicatorSeries>,
    title: Option<String>,
}

impl<'a> ChartBuilder<'a> {
    pub fn new(series: &'a PriceSeries) -> Self {
        Self {
            series,
            indicators: Vec::new(),
            title: None,
        }
    }

    /// Add one line overlay per indicator series.
    pub fn with_indicators(mut self, indicators: &'a [IndicatorSeries]) -> Self {
        self.indicators.extend(indicators.iter());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn build(self) -> ChartSpec {
        let range = self.series.range();
        let title = self.title.unwrap_or_else(|| {
            format!("{} {} → {}", self.series.symbol(), range.start, range.end)
        });

        // Nothing to draw without prices, overlays included
        if self.series.is_empty() {
            return ChartSpec::empty(title);
        }

        let candles = self
            .series
            .observations()
            .iter()
            .map(|o| Candle {
                date: o.date,
                open: o.open,
                high: o.high,
                low: o.low,
                close: o.close,
            })
            .collect();

        let mut layers = vec![ChartLayer::Candlestick {
            name: "Candlestick".to_string(),
            candles,
        }];

        for (i, indicator) in self.indicators.iter().enumerate() {
            layers.push(ChartLayer::Line {
                name: indicator.name.clone(),
                indicator: indicator.kind,
                color: overlay_color(indicator.kind, i),
                points: indicator.defined().collect(),
            });
        }

        ChartSpec {
            title,
            layers,
            range_slider: false,
        }
    }
}

/// Both Bollinger bands share one colour so they read as an envelope.
fn overlay_color(kind: IndicatorKind, position: usize) -> Rgb {
    match kind {
        IndicatorKind::Bollinger20 => Rgb(128, 128, 128),
        _ => OVERLAY_PALETTE[position % OVERLAY_PALETTE.len()],
    }
}
