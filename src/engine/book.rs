use std::collections::{BTreeMap, HashMap};

use crate::error::EngineError;
use crate::models::{StopOrder, StopOrderStatus};

/// Pending stop orders, keyed by id and partitioned by symbol.
///
/// Orders live here only while pending. Triggering or cancelling removes
/// them atomically; the returned value is frozen with its final status.
#[derive(Debug, Default)]
pub struct StopOrderBook {
    orders: HashMap<u64, StopOrder>,
    /// Per symbol: insertion sequence -> order id, so a partition always
    /// iterates in insertion order.
    by_symbol: HashMap<String, BTreeMap<u64, u64>>,
    next_sequence: u64,
}

impl StopOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new pending order and assign its insertion sequence.
    ///
    /// Fails with `DuplicateOrderId` if the id is already present; the
    /// existing order is left untouched.
    pub fn insert(&mut self, mut order: StopOrder) -> Result<u64, EngineError> {
        if self.orders.contains_key(&order.id) {
            return Err(EngineError::DuplicateOrderId(order.id));
        }

        self.next_sequence += 1;
        order.sequence = self.next_sequence;
        order.status = StopOrderStatus::Pending;

        self.by_symbol
            .entry(order.symbol.clone())
            .or_default()
            .insert(order.sequence, order.id);

        let sequence = order.sequence;
        self.orders.insert(order.id, order);

        Ok(sequence)
    }

    /// Cancel a pending order and hand it back with status `Cancelled`
    pub fn cancel(&mut self, id: u64) -> Result<StopOrder, EngineError> {
        let mut order = self.remove(id).ok_or(EngineError::OrderNotPending(id))?;
        order.status = StopOrderStatus::Cancelled;

        tracing::debug!(id, symbol = %order.symbol, "cancelled stop order");

        Ok(order)
    }

    /// Cancel every pending order for a symbol, in insertion order
    pub fn cancel_all(&mut self, symbol: &str) -> Vec<StopOrder> {
        let ids: Vec<u64> = self
            .by_symbol
            .get(symbol)
            .map(|index| index.values().copied().collect())
            .unwrap_or_default();

        ids.into_iter()
            .filter_map(|id| self.cancel(id).ok())
            .collect()
    }

    /// All pending orders for a symbol, in insertion order
    pub fn pending_for(&self, symbol: &str) -> Vec<&StopOrder> {
        self.by_symbol
            .get(symbol)
            .map(|index| {
                index
                    .values()
                    .filter_map(|id| self.orders.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove a triggered order under the evaluation pass that discovered
    /// it, so no order is ever evaluated twice against one tick.
    pub fn take_triggered(&mut self, id: u64) -> Option<StopOrder> {
        let mut order = self.remove(id)?;
        order.status = StopOrderStatus::Triggered;
        Some(order)
    }

    pub fn pending_count(&self, symbol: &str) -> usize {
        self.by_symbol.get(symbol).map(|index| index.len()).unwrap_or(0)
    }

    fn remove(&mut self, id: u64) -> Option<StopOrder> {
        let order = self.orders.remove(&id)?;

        if let Some(index) = self.by_symbol.get_mut(&order.symbol) {
            index.remove(&order.sequence);
            if index.is_empty() {
                self.by_symbol.remove(&order.symbol);
            }
        }

        Some(order)
    }
}
