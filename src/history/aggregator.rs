use crate::models::Bar;

/// Rolls runs of `period_multiple` finest bars into single reporting
/// bars for strategies.
///
/// The emitted bar carries the first constituent's timestamp and open,
/// the last one's close, open interest and trading day, the extremes as
/// high/low and the summed volume. A multiple of 1 passes bars through
/// unchanged.
#[derive(Debug)]
pub struct BarAggregator {
    period_multiple: usize,
    partial: Option<Bar>,
    filled: usize,
}

impl BarAggregator {
    pub fn new(period_multiple: usize) -> Self {
        Self {
            period_multiple: period_multiple.max(1),
            partial: None,
            filled: 0,
        }
    }

    pub fn period_multiple(&self) -> usize {
        self.period_multiple
    }

    /// Feed one finest bar; returns the reporting bar when its run closes
    pub fn update(&mut self, bar: &Bar) -> Option<Bar> {
        match self.partial.as_mut() {
            None => {
                self.partial = Some(bar.clone());
                self.filled = 1;
            }
            Some(partial) => {
                partial.high = partial.high.max(bar.high);
                partial.low = partial.low.min(bar.low);
                partial.close = bar.close;
                partial.volume += bar.volume;
                partial.open_interest = bar.open_interest;
                partial.trading_day = bar.trading_day;
                self.filled += 1;
            }
        }

        if self.filled == self.period_multiple {
            self.filled = 0;
            self.partial.take()
        } else {
            None
        }
    }

    /// Roll a whole loaded window; a trailing incomplete run (the period
    /// still forming when the window was cut) is dropped. The loader's
    /// alignment arithmetic guarantees the first run is complete.
    pub fn aggregate(period_multiple: usize, bars: &[Bar]) -> Vec<Bar> {
        let mut aggregator = Self::new(period_multiple);
        bars.iter()
            .filter_map(|bar| aggregator.update(bar))
            .collect()
    }
}
