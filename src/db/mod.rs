// Day-partitioned bar store
pub mod memory;
pub mod postgres;

pub use memory::MemoryBarStore;
pub use postgres::PostgresBarStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::models::Bar;

/// Read interface the history loader scans over.
///
/// Implementations are day-partitioned: one query returns one symbol's
/// bars for one trading day.
#[async_trait]
pub trait BarSource: Send + Sync {
    /// All finest-granularity bars for (symbol, day). A day with no data
    /// yields an empty vec, never an error.
    async fn query_bars_by_day(&self, symbol: &str, day: NaiveDate)
        -> Result<Vec<Bar>, StoreError>;

    /// Total finest-granularity bars ever stored for the symbol
    async fn count_bars(&self, symbol: &str) -> Result<u64, StoreError>;
}

#[async_trait]
impl<S: BarSource + ?Sized> BarSource for Arc<S> {
    async fn query_bars_by_day(
        &self,
        symbol: &str,
        day: NaiveDate,
    ) -> Result<Vec<Bar>, StoreError> {
        (**self).query_bars_by_day(symbol, day).await
    }

    async fn count_bars(&self, symbol: &str) -> Result<u64, StoreError> {
        (**self).count_bars(symbol).await
    }
}
