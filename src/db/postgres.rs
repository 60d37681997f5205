use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::db::BarSource;
use crate::error::StoreError;
use crate::models::Bar;
use crate::Result;

/// Postgres-backed day-partitioned bar store
pub struct PostgresBarStore {
    pool: PgPool,
}

impl PostgresBarStore {
    /// Connect to Postgres and run migrations
    ///
    /// # Arguments
    /// * `database_url` - Postgres connection URL
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Connected to Postgres at {}", database_url);

        Ok(Self { pool })
    }

    /// Persist one finished finest-granularity bar.
    ///
    /// Re-saving the same (symbol, timestamp) overwrites the row, so the
    /// recorder side can safely re-emit a bar after a reconnect.
    pub async fn save_bar(&self, bar: &Bar) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bars (
                symbol, trading_day, ts, open, high, low, close, volume, open_interest
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (symbol, ts) DO UPDATE SET
                trading_day = EXCLUDED.trading_day,
                open = EXCLUDED.open,
                high = EXCLUDED.high,
                low = EXCLUDED.low,
                close = EXCLUDED.close,
                volume = EXCLUDED.volume,
                open_interest = EXCLUDED.open_interest
            "#,
        )
        .bind(&bar.symbol)
        .bind(bar.trading_day)
        .bind(bar.timestamp)
        .bind(bar.open)
        .bind(bar.high)
        .bind(bar.low)
        .bind(bar.close)
        .bind(bar.volume)
        .bind(bar.open_interest)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Saved bar {} {} to Postgres", bar.symbol, bar.timestamp);

        Ok(())
    }

    pub async fn save_bars(&self, bars: &[Bar]) -> Result<()> {
        for bar in bars {
            self.save_bar(bar).await?;
        }

        tracing::debug!("Saved {} bars to Postgres", bars.len());

        Ok(())
    }

    /// Delete all bars for a symbol (testing only)
    #[cfg(test)]
    pub async fn clear_symbol(&self, symbol: &str) -> Result<()> {
        sqlx::query("DELETE FROM bars WHERE symbol = $1")
            .bind(symbol)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn row_to_bar(row: &PgRow) -> Bar {
    let open: rust_decimal::Decimal = row.get("open");
    let high: rust_decimal::Decimal = row.get("high");
    let low: rust_decimal::Decimal = row.get("low");
    let close: rust_decimal::Decimal = row.get("close");
    let volume: rust_decimal::Decimal = row.get("volume");
    let open_interest: rust_decimal::Decimal = row.get("open_interest");
    let trading_day: NaiveDate = row.get("trading_day");
    let timestamp: DateTime<Utc> = row.get("ts");

    Bar {
        symbol: row.get("symbol"),
        trading_day,
        timestamp,
        open: open.to_f64().unwrap_or(0.0),
        high: high.to_f64().unwrap_or(0.0),
        low: low.to_f64().unwrap_or(0.0),
        close: close.to_f64().unwrap_or(0.0),
        volume: volume.to_f64().unwrap_or(0.0),
        open_interest: open_interest.to_f64().unwrap_or(0.0),
    }
}

#[async_trait]
impl BarSource for PostgresBarStore {
    async fn query_bars_by_day(
        &self,
        symbol: &str,
        day: NaiveDate,
    ) -> std::result::Result<Vec<Bar>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, trading_day, ts, open, high, low, close, volume, open_interest
            FROM bars
            WHERE symbol = $1 AND trading_day = $2
            ORDER BY ts ASC
            "#,
        )
        .bind(symbol)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_bar).collect())
    }

    async fn count_bars(&self, symbol: &str) -> std::result::Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM bars WHERE symbol = $1")
            .bind(symbol)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.get("count");
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn get_test_store() -> PostgresBarStore {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/futuresbot_test".to_string());

        PostgresBarStore::new(&database_url)
            .await
            .expect("Failed to connect to test database")
    }

    fn create_test_bar(symbol: &str, day: NaiveDate, minute: u32, close: f64) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            trading_day: day,
            timestamp: day.and_hms_opt(21, minute, 0).unwrap().and_utc(),
            open: close - 1.0,
            high: close + 2.0,
            low: close - 3.0,
            close,
            volume: 250.0,
            open_interest: 120_000.0,
        }
    }

    #[tokio::test]
    #[ignore] // Requires Postgres running
    async fn test_save_and_query_by_day() {
        let store = get_test_store().await;
        store.clear_symbol("rb2410").await.unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        store
            .save_bar(&create_test_bar("rb2410", day, 0, 3600.0))
            .await
            .unwrap();
        store
            .save_bar(&create_test_bar("rb2410", day, 1, 3605.0))
            .await
            .unwrap();

        let bars = store.query_bars_by_day("rb2410", day).await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 3600.0);
        assert_eq!(bars[1].close, 3605.0);

        store.clear_symbol("rb2410").await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Postgres running
    async fn test_resave_overwrites_row() {
        let store = get_test_store().await;
        store.clear_symbol("rb2410").await.unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let mut bar = create_test_bar("rb2410", day, 0, 3600.0);
        store.save_bar(&bar).await.unwrap();

        bar.close = 3610.0;
        store.save_bar(&bar).await.unwrap();

        let bars = store.query_bars_by_day("rb2410", day).await.unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 3610.0);

        store.clear_symbol("rb2410").await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Postgres running
    async fn test_missing_day_is_empty() {
        let store = get_test_store().await;
        store.clear_symbol("rb2410").await.unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let bars = store.query_bars_by_day("rb2410", day).await.unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires Postgres running
    async fn test_count_bars_spans_days() {
        let store = get_test_store().await;
        store.clear_symbol("rb2410").await.unwrap();

        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();

        store
            .save_bars(&[
                create_test_bar("rb2410", monday, 0, 3600.0),
                create_test_bar("rb2410", tuesday, 0, 3620.0),
            ])
            .await
            .unwrap();

        assert_eq!(store.count_bars("rb2410").await.unwrap(), 2);

        store.clear_symbol("rb2410").await.unwrap();
    }
}
