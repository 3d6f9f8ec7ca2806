use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the chart-analysis actions.
///
/// None of these are fatal: callers report them to the user and keep
/// whatever session state they had before the failing action.
#[derive(Debug, Error)]
pub enum AnalystError {
    #[error("No price data for {symbol} between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("{indicator} needs at least {required} observations, series has {available}")]
    InsufficientData {
        indicator: String,
        required: usize,
        available: usize,
    },

    #[error("{indicator} is undefined on {date}: {reason}")]
    UndefinedValue {
        indicator: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("Chart render failed: {0}")]
    Render(String),

    #[error("Vision model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Market data lookup failed: {0}")]
    MarketData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AnalystError {
    /// Short machine-readable name, used in logs and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalystError::NoData { .. } => "no_data",
            AnalystError::InsufficientData { .. } => "insufficient_data",
            AnalystError::UndefinedValue { .. } => "undefined_value",
            AnalystError::Render(_) => "render_error",
            AnalystError::ModelUnavailable(_) => "model_unavailable",
            AnalystError::MarketData(_) => "market_data_error",
            AnalystError::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<image::ImageError> for AnalystError {
    fn from(err: image::ImageError) -> Self {
        AnalystError::Render(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalystError>;
