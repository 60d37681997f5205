// Stop order trigger pipeline and engine runtime
pub mod book;
pub mod priority;
pub mod trigger;
pub mod worker;

pub use book::StopOrderBook;
pub use priority::StopOrderCategory;
pub use trigger::TriggerCandidate;
pub use worker::EngineRuntime;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::EngineError;
use crate::gateway::OrderGateway;
use crate::history::BarCache;
use crate::models::{Bar, Direction, Offset, StopOrder, StopOrderStatus, Tick};
use crate::strategy::Strategy;

/// A stop order applied by one tick: removed from the book, submitted to
/// the venue unless it was a pure price alarm, reported via callback.
#[derive(Debug, Clone, Serialize)]
pub struct TriggeredStop {
    pub order: StopOrder,
    pub fill_price: f64,
    /// Venue order id; `None` for zero-volume price alarms
    pub venue_order_id: Option<String>,
}

/// The engine instance owning the stop order book and the recent-bar
/// cache. One per process; symbol workers share it behind a mutex.
pub struct StopEngine<G: OrderGateway> {
    book: StopOrderBook,
    bar_cache: BarCache,
    gateway: G,
    strategies: HashMap<String, Box<dyn Strategy>>,
    next_order_id: u64,
    last_tick_at: HashMap<String, DateTime<Utc>>,
}

impl<G: OrderGateway> StopEngine<G> {
    pub fn new(gateway: G, bar_cache_size: usize) -> Self {
        Self {
            book: StopOrderBook::new(),
            bar_cache: BarCache::new(bar_cache_size),
            gateway,
            strategies: HashMap::new(),
            next_order_id: 0,
            last_tick_at: HashMap::new(),
        }
    }

    /// Register the strategy that receives callbacks for a symbol
    pub fn register_strategy(&mut self, symbol: impl Into<String>, strategy: Box<dyn Strategy>) {
        let symbol = symbol.into();
        tracing::info!(%symbol, "registered strategy");
        self.strategies.insert(symbol, strategy);
    }

    /// Place a locally simulated stop order.
    ///
    /// Ids come from a monotonic counter owned by the engine; the book
    /// assigns the insertion sequence used for tie-breaking.
    pub fn place_stop_order(
        &mut self,
        symbol: impl Into<String>,
        direction: Direction,
        offset: Offset,
        trigger_price: f64,
        volume: f64,
    ) -> Result<u64, EngineError> {
        self.next_order_id += 1;
        let id = self.next_order_id;

        let order = StopOrder {
            id,
            symbol: symbol.into(),
            direction,
            offset,
            trigger_price,
            volume,
            status: StopOrderStatus::Pending,
            sequence: 0, // assigned by the book
        };

        self.book.insert(order)?;
        tracing::debug!(id, trigger_price, volume, "placed stop order");

        Ok(id)
    }

    pub fn cancel_stop_order(&mut self, id: u64) -> Result<StopOrder, EngineError> {
        self.book.cancel(id)
    }

    /// Cancel every pending stop order for a symbol, returning how many
    pub fn cancel_all(&mut self, symbol: &str) -> usize {
        self.book.cancel_all(symbol).len()
    }

    pub fn pending_stop_orders(&self, symbol: &str) -> Vec<StopOrder> {
        self.book.pending_for(symbol).into_iter().cloned().collect()
    }

    /// Run the full pipeline for one tick: evaluate, sort, apply.
    ///
    /// The candidate set is collected before anything is applied and the
    /// batch is validated before the first removal, so a rejected batch
    /// leaves the book exactly as it was. Each emitted order is fully
    /// processed (removed, submitted, reported) before the next one.
    pub fn process_tick(&mut self, tick: &Tick) -> Result<Vec<TriggeredStop>, EngineError> {
        if let Some(last) = self.last_tick_at.get(&tick.symbol) {
            if tick.timestamp < *last {
                // Reportable anomaly only; the tick is still processed
                tracing::warn!(
                    symbol = %tick.symbol,
                    "feed timestamp went backwards: {} -> {}",
                    last,
                    tick.timestamp
                );
            }
        }
        self.last_tick_at.insert(tick.symbol.clone(), tick.timestamp);

        let pending = self.book.pending_for(&tick.symbol);
        let candidates = trigger::evaluate(tick, &pending);

        let fills = if candidates.is_empty() {
            Vec::new()
        } else {
            let fill_prices: HashMap<u64, f64> = candidates
                .iter()
                .map(|candidate| (candidate.order_id, candidate.fill_price))
                .collect();

            let batch: Vec<StopOrder> = pending
                .into_iter()
                .filter(|order| fill_prices.contains_key(&order.id))
                .cloned()
                .collect();

            let ordered = priority::sort_for_emission(batch)?;
            self.apply_triggered(&ordered, &fill_prices)?
        };

        if let Some(strategy) = self.strategies.get_mut(&tick.symbol) {
            strategy.on_tick(tick);
        }

        Ok(fills)
    }

    /// Record a finished finest-granularity bar and forward it to the
    /// symbol's strategy
    pub fn process_bar(&mut self, bar: &Bar) {
        self.bar_cache.push(bar.clone());
        if let Some(strategy) = self.strategies.get_mut(&bar.symbol) {
            strategy.on_bar(bar);
        }
    }

    /// The most recent `count` cached bars for a symbol, oldest first
    pub fn recent_bars(&self, symbol: &str, count: usize) -> Vec<Bar> {
        self.bar_cache.recent(symbol, count)
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn apply_triggered(
        &mut self,
        ordered: &[StopOrder],
        fill_prices: &HashMap<u64, f64>,
    ) -> Result<Vec<TriggeredStop>, EngineError> {
        let mut fills = Vec::with_capacity(ordered.len());

        for entry in ordered {
            // Both lookups are guaranteed by construction; a miss is a
            // logic defect and aborts visibly rather than skipping.
            let order = self.book.take_triggered(entry.id).ok_or_else(|| {
                EngineError::Configuration(format!(
                    "triggered order {} vanished from the book",
                    entry.id
                ))
            })?;
            let fill_price = *fill_prices.get(&entry.id).ok_or_else(|| {
                EngineError::Configuration(format!("no fill price for triggered order {}", entry.id))
            })?;

            let venue_order_id = if order.volume > 0.0 {
                let venue_order_id = self
                    .gateway
                    .submit(
                        &order.symbol,
                        order.direction,
                        order.offset,
                        fill_price,
                        order.volume,
                    )
                    .map_err(|err| EngineError::Submission(err.to_string()))?;

                if let Some(strategy) = self.strategies.get_mut(&order.symbol) {
                    strategy.on_order_submitted(&order, &venue_order_id);
                }

                Some(venue_order_id)
            } else {
                // Zero volume is a price alarm: trigger and report only
                None
            };

            tracing::info!(
                id = order.id,
                symbol = %order.symbol,
                fill_price,
                submitted = venue_order_id.is_some(),
                "stop order triggered"
            );

            if let Some(strategy) = self.strategies.get_mut(&order.symbol) {
                strategy.on_stop_order_triggered(&order, fill_price);
            }

            fills.push(TriggeredStop {
                order,
                fill_price,
                venue_order_id,
            });
        }

        Ok(fills)
    }
}
