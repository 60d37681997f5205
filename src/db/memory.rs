use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::BarSource;
use crate::error::StoreError;
use crate::models::Bar;

/// In-memory bar store, day-partitioned like the Postgres schema.
///
/// Backs the loader in tests and in paper sessions without a database.
#[derive(Debug, Default)]
pub struct MemoryBarStore {
    days: RwLock<HashMap<(String, NaiveDate), Vec<Bar>>>,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_bar(&self, bar: Bar) -> Result<(), StoreError> {
        let mut days = self
            .days
            .write()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        days.entry((bar.symbol.clone(), bar.trading_day))
            .or_default()
            .push(bar);

        Ok(())
    }

    pub fn insert_bars(&self, bars: impl IntoIterator<Item = Bar>) -> Result<(), StoreError> {
        for bar in bars {
            self.insert_bar(bar)?;
        }
        Ok(())
    }
}

#[async_trait]
impl BarSource for MemoryBarStore {
    async fn query_bars_by_day(
        &self,
        symbol: &str,
        day: NaiveDate,
    ) -> Result<Vec<Bar>, StoreError> {
        let days = self
            .days
            .read()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        Ok(days
            .get(&(symbol.to_string(), day))
            .cloned()
            .unwrap_or_default())
    }

    async fn count_bars(&self, symbol: &str) -> Result<u64, StoreError> {
        let days = self
            .days
            .read()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        Ok(days
            .iter()
            .filter(|((stored_symbol, _), _)| stored_symbol == symbol)
            .map(|(_, bars)| bars.len() as u64)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_bar(symbol: &str, day: NaiveDate, minute: u32) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            trading_day: day,
            timestamp: day.and_hms_opt(9, minute, 0).unwrap().and_utc(),
            open: 3600.0,
            high: 3605.0,
            low: 3595.0,
            close: 3602.0,
            volume: 10.0,
            open_interest: 100.0,
        }
    }

    #[tokio::test]
    async fn test_query_day_partition() {
        let store = MemoryBarStore::new();
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();

        store.insert_bar(create_test_bar("rb2410", monday, 0)).unwrap();
        store.insert_bar(create_test_bar("rb2410", monday, 1)).unwrap();
        store.insert_bar(create_test_bar("rb2410", tuesday, 0)).unwrap();

        let bars = store.query_bars_by_day("rb2410", monday).await.unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_day_is_empty_not_error() {
        let store = MemoryBarStore::new();
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        let bars = store.query_bars_by_day("rb2410", day).await.unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_count_spans_all_days_of_symbol() {
        let store = MemoryBarStore::new();
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();

        store.insert_bar(create_test_bar("rb2410", monday, 0)).unwrap();
        store.insert_bar(create_test_bar("rb2410", tuesday, 0)).unwrap();
        store.insert_bar(create_test_bar("cu2408", monday, 0)).unwrap();

        assert_eq!(store.count_bars("rb2410").await.unwrap(), 2);
        assert_eq!(store.count_bars("cu2408").await.unwrap(), 1);
        assert_eq!(store.count_bars("au2412").await.unwrap(), 0);
    }
}
