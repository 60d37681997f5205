// Strategy callback surface
use crate::history::BarAggregator;
use crate::models::{Bar, BarWindow, StopOrder, Tick};

/// Capability set a strategy registers with the engine.
///
/// Every method has an empty default, so a variant implements only the
/// callbacks it actually consumes. Decision logic itself lives outside
/// this crate; the engine only drives these hooks.
pub trait Strategy: Send + Sync {
    /// Strategy name, used in logs
    fn name(&self) -> &str;

    /// Replay a loaded history window to warm up internal state
    fn on_init(&mut self, window: &BarWindow) {
        for bar in window.bars() {
            self.on_bar(bar);
        }
    }

    fn on_tick(&mut self, _tick: &Tick) {}

    fn on_bar(&mut self, _bar: &Bar) {}

    /// Invoked once per triggered stop order, in emission order
    fn on_stop_order_triggered(&mut self, _order: &StopOrder, _fill_price: f64) {}

    /// Invoked after the venue accepted the submission for a triggered
    /// stop order
    fn on_order_submitted(&mut self, _order: &StopOrder, _venue_order_id: &str) {}
}

/// Logs every callback and rolls finest bars into reporting bars.
///
/// Stands in for a real strategy in paper sessions: it exercises the
/// whole callback surface without making any decisions.
pub struct LoggingStrategy {
    name: String,
    aggregator: BarAggregator,
    reporting_bars: u64,
}

impl LoggingStrategy {
    pub fn new(name: impl Into<String>, period_multiple: usize) -> Self {
        Self {
            name: name.into(),
            aggregator: BarAggregator::new(period_multiple),
            reporting_bars: 0,
        }
    }

    pub fn reporting_bars(&self) -> u64 {
        self.reporting_bars
    }
}

impl Strategy for LoggingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_init(&mut self, window: &BarWindow) {
        if !window.is_full() {
            tracing::warn!(
                strategy = %self.name,
                loaded = window.len(),
                target = window.target(),
                "initializing from a short history window"
            );
        }

        for bar in window.bars() {
            self.on_bar(bar);
        }

        tracing::info!(
            strategy = %self.name,
            bars = window.len(),
            reporting_bars = self.reporting_bars,
            "initialized from history"
        );
    }

    fn on_tick(&mut self, tick: &Tick) {
        tracing::trace!(strategy = %self.name, price = tick.last_price, "tick");
    }

    fn on_bar(&mut self, bar: &Bar) {
        if let Some(reporting) = self.aggregator.update(bar) {
            self.reporting_bars += 1;
            tracing::debug!(
                strategy = %self.name,
                timestamp = %reporting.timestamp,
                close = reporting.close,
                "reporting bar completed"
            );
        }
    }

    fn on_stop_order_triggered(&mut self, order: &StopOrder, fill_price: f64) {
        tracing::info!(
            strategy = %self.name,
            order_id = order.id,
            fill_price,
            "stop order triggered"
        );
    }

    fn on_order_submitted(&mut self, order: &StopOrder, venue_order_id: &str) {
        tracing::info!(
            strategy = %self.name,
            order_id = order.id,
            venue_order_id,
            "venue accepted order"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn create_test_bar(minute: u32, close: f64) -> Bar {
        Bar {
            symbol: "rb2410".to_string(),
            trading_day: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 9, minute, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 10.0,
            open_interest: 100.0,
        }
    }

    #[test]
    fn test_on_init_replays_window_through_aggregator() {
        let mut strategy = LoggingStrategy::new("logger", 3);

        let bars: Vec<Bar> = (0..9).map(|i| create_test_bar(i, 3600.0 + i as f64)).collect();
        let window = BarWindow::new(bars, 9);

        strategy.on_init(&window);

        assert_eq!(strategy.reporting_bars(), 3);
    }

    #[test]
    fn test_default_callbacks_are_noops() {
        struct Bare;
        impl Strategy for Bare {
            fn name(&self) -> &str {
                "bare"
            }
        }

        let mut bare = Bare;
        bare.on_bar(&create_test_bar(0, 3600.0));
        bare.on_tick(&Tick {
            symbol: "rb2410".to_string(),
            last_price: 3600.0,
            upper_limit: 3960.0,
            lower_limit: 3240.0,
            timestamp: Utc::now(),
        });
    }
}
