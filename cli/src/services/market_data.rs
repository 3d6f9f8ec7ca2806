use async_trait::async_trait;

use crate::{
    error::Result,
    models::{DateRange, PriceSeries},
};

/// Source of daily price history.
///
/// `Ok` with an empty series means the lookup worked but the symbol has no
/// rows in the range; `Err(AnalystError::MarketData)` means the lookup itself
/// failed (transport, HTTP status, unreadable payload).
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, symbol: &str, range: DateRange) -> Result<PriceSeries>;
}
