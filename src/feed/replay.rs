use chrono::NaiveDate;

use crate::models::{Bar, Tick};

/// Replays stored bars as the tick stream a live session would have
/// produced, one tick per bar close.
///
/// Price limits are synthesized per trading day from the day's first
/// open and a fixed band ratio, standing in for the venue's daily limit
/// rule. The engine's fill convention then behaves identically whether
/// it is fed by this replay or by a live gateway.
pub struct ReplayFeed {
    bars: std::vec::IntoIter<Bar>,
    limit_ratio: f64,
    current_day: Option<(NaiveDate, f64)>,
}

impl ReplayFeed {
    /// # Arguments
    /// * `bars` - ascending finest-granularity bars for one symbol
    /// * `limit_ratio` - daily price band, e.g. 0.1 for +-10%
    pub fn new(bars: Vec<Bar>, limit_ratio: f64) -> Self {
        Self {
            bars: bars.into_iter(),
            limit_ratio,
            current_day: None,
        }
    }

    fn tick_for(&mut self, bar: &Bar) -> Tick {
        let reference = match self.current_day {
            Some((day, reference)) if day == bar.trading_day => reference,
            _ => {
                self.current_day = Some((bar.trading_day, bar.open));
                bar.open
            }
        };

        Tick {
            symbol: bar.symbol.clone(),
            last_price: bar.close,
            upper_limit: reference * (1.0 + self.limit_ratio),
            lower_limit: reference * (1.0 - self.limit_ratio),
            timestamp: bar.timestamp,
        }
    }
}

impl Iterator for ReplayFeed {
    /// The tick is dispatched before its finished bar
    type Item = (Tick, Bar);

    fn next(&mut self) -> Option<Self::Item> {
        let bar = self.bars.next()?;
        let tick = self.tick_for(&bar);
        Some((tick, bar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_bar(day: u32, minute: u32, open: f64, close: f64) -> Bar {
        let trading_day = NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        Bar {
            symbol: "rb2410".to_string(),
            trading_day,
            timestamp: trading_day.and_hms_opt(9, minute, 0).unwrap().and_utc(),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 10.0,
            open_interest: 100.0,
        }
    }

    #[test]
    fn test_one_tick_per_bar_close() {
        let bars = vec![
            create_test_bar(3, 0, 3600.0, 3610.0),
            create_test_bar(3, 1, 3610.0, 3605.0),
        ];

        let events: Vec<(Tick, Bar)> = ReplayFeed::new(bars, 0.1).collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0.last_price, 3610.0);
        assert_eq!(events[1].0.last_price, 3605.0);
        assert_eq!(events[0].0.timestamp, events[0].1.timestamp);
    }

    #[test]
    fn test_limits_derive_from_day_open() {
        let bars = vec![
            create_test_bar(3, 0, 3600.0, 3610.0),
            create_test_bar(3, 1, 3610.0, 3620.0),
        ];

        let events: Vec<(Tick, Bar)> = ReplayFeed::new(bars, 0.1).collect();

        // Both ticks share the day's band even as the price moves
        for (tick, _) in &events {
            assert_eq!(tick.upper_limit, 3600.0 * 1.1);
            assert_eq!(tick.lower_limit, 3600.0 * 0.9);
        }
    }

    #[test]
    fn test_day_rollover_resets_band() {
        let bars = vec![
            create_test_bar(3, 0, 3600.0, 3700.0),
            create_test_bar(4, 0, 3700.0, 3710.0),
        ];

        let events: Vec<(Tick, Bar)> = ReplayFeed::new(bars, 0.1).collect();

        assert_eq!(events[0].0.upper_limit, 3600.0 * 1.1);
        assert_eq!(events[1].0.upper_limit, 3700.0 * 1.1);
    }
}
