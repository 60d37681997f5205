use chrono::{Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::Bar;

/// Seeded random-walk bar generator for paper sessions and tests.
///
/// Walks a sideways price path with small per-bar noise, one session of
/// one-minute bars per trading day. The same seed always produces the
/// same bars, so paper runs are reproducible.
pub struct SyntheticBarGenerator {
    rng: StdRng,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticBarGenerator {
    /// Create a generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 3600.0,
            base_volume: 500.0,
        }
    }

    /// Generate `bars_per_day` one-minute bars on each of `days`
    /// consecutive trading days ending at `last_day`, oldest first
    pub fn generate_days(
        &mut self,
        symbol: &str,
        last_day: NaiveDate,
        days: u32,
        bars_per_day: u32,
    ) -> Vec<Bar> {
        let session_open = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
        let mut bars = Vec::with_capacity((days * bars_per_day) as usize);
        let mut price = self.base_price;
        let mut open_interest = 100_000.0;

        for day_offset in (0..days as i64).rev() {
            let trading_day = last_day - Duration::days(day_offset);
            let session_start = trading_day.and_time(session_open).and_utc();

            for minute in 0..bars_per_day {
                let open = price;
                // +-0.2% noise per bar keeps the walk sideways
                price *= 1.0 + self.rng.gen_range(-0.002..0.002);
                let close = price;

                let spread = (open - close).abs().max(open * 0.0005);
                let high = open.max(close) + self.rng.gen_range(0.0..spread);
                let low = open.min(close) - self.rng.gen_range(0.0..spread);

                open_interest += self.rng.gen_range(-50.0..50.0);

                bars.push(Bar {
                    symbol: symbol.to_string(),
                    trading_day,
                    timestamp: session_start + Duration::minutes(minute as i64),
                    open,
                    high,
                    low,
                    close,
                    volume: self.base_volume * self.rng.gen_range(0.5..1.5),
                    open_interest,
                });
            }
        }

        bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    #[test]
    fn test_same_seed_same_bars() {
        let first = SyntheticBarGenerator::new(7).generate_days("rb2410", last_day(), 3, 20);
        let second = SyntheticBarGenerator::new(7).generate_days("rb2410", last_day(), 3, 20);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.close, b.close);
            assert_eq!(a.timestamp, b.timestamp);
        }
    }

    #[test]
    fn test_counts_and_ascending_timestamps() {
        let bars = SyntheticBarGenerator::new(1).generate_days("rb2410", last_day(), 5, 30);

        assert_eq!(bars.len(), 150);
        for pair in bars.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
        assert_eq!(bars.last().unwrap().trading_day, last_day());
    }

    #[test]
    fn test_ohlc_is_consistent() {
        let bars = SyntheticBarGenerator::new(3).generate_days("rb2410", last_day(), 2, 50);

        for bar in &bars {
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.volume > 0.0);
        }
    }
}
