//! # chartanalyst - AI technical-analysis chart library
//!
//! Fetches daily stock prices, overlays technical indicators on a
//! candlestick chart and asks a vision model to read the rendered chart:
//! - SMA(20), EMA(20), Bollinger Bands(20, 2) and VWAP
//! - Candlestick chart assembly and in-process PNG rendering
//! - Yahoo Finance and local CSV price sources
//! - Ollama vision model client
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chartanalyst::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dashboard = DashboardBuilder::new().build()?;
//!     let mut session = Session::new();
//!     dashboard.fetch(&mut session, "AAPL", DateRange::default()).await?;
//!     let answer = dashboard.analyze(&session, &[IndicatorKind::Sma20]).await?;
//!     println!("{}", answer.text);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod models;
pub mod utils;
pub mod services;
pub mod indicators;
pub mod chart;
pub mod ask_ai;
pub mod session;

// Public API for easy library usage
pub mod api;

pub mod prelude {
    //! Commonly used types: `use chartanalyst::prelude::*;`

    pub use crate::api::{ChartView, Dashboard, DashboardBuilder, DataSourceKind, FetchSummary};
    pub use crate::ask_ai::{AnalysisResponse, VisionModel};
    pub use crate::error::{AnalystError, Result};
    pub use crate::indicators::{parse_selection, IndicatorKind, IndicatorSeries};
    pub use crate::models::{ChartSpec, DateRange, PriceObservation, PriceSeries};
    pub use crate::services::MarketDataSource;
    pub use crate::session::Session;
}

pub use utils::{init_logger, Logger, Timer};
