use std::collections::{HashMap, VecDeque};

use crate::models::Bar;

/// Rolling per-symbol window of the most recent finest bars.
///
/// Owned by the engine; the per-symbol worker serialization means no
/// internal locking is needed here.
#[derive(Debug)]
pub struct BarCache {
    data: HashMap<String, VecDeque<Bar>>,
    max_bars: usize,
}

impl BarCache {
    /// # Arguments
    /// * `max_bars` - Maximum number of bars to keep per symbol
    pub fn new(max_bars: usize) -> Self {
        Self {
            data: HashMap::new(),
            max_bars,
        }
    }

    /// Add a bar for its symbol, dropping the oldest once full
    pub fn push(&mut self, bar: Bar) {
        let bars = self.data.entry(bar.symbol.clone()).or_default();

        bars.push_back(bar);
        while bars.len() > self.max_bars {
            bars.pop_front();
        }
    }

    /// The `n` most recent bars for a symbol, oldest first
    pub fn recent(&self, symbol: &str, n: usize) -> Vec<Bar> {
        self.data
            .get(symbol)
            .map(|bars| bars.iter().rev().take(n).rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.data.get(symbol).map(|bars| bars.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, symbol: &str) -> bool {
        self.len(symbol) == 0
    }

    pub fn clear(&mut self, symbol: &str) {
        self.data.remove(symbol);
    }
}
