//! High-level API: the dashboard actions and their wiring.

pub mod builder;
pub mod dashboard;

pub use builder::{DashboardBuilder, DataSourceKind};
pub use dashboard::{ChartView, Dashboard, FetchSummary, IndicatorReading};
