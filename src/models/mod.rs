use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Side of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

/// Whether an order opens new exposure or closes existing exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Offset {
    Open,
    Close,
}

/// Lifecycle of a locally simulated stop order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopOrderStatus {
    Pending,
    Triggered,
    Cancelled,
}

/// A conditional order this engine simulates locally because the venue
/// has no native stop orders.
///
/// Owned exclusively by the book while pending; once triggered or
/// cancelled the value is frozen and handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopOrder {
    pub id: u64,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub trigger_price: f64,
    /// Zero volume marks a price alarm: it triggers and is reported but
    /// nothing is submitted to the venue.
    pub volume: f64,
    pub status: StopOrderStatus,
    /// Assigned by the book at insertion; breaks price ties.
    pub sequence: u64,
}

/// One price update from the venue feed, consumed once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub last_price: f64,
    pub upper_limit: f64,
    pub lower_limit: f64,
    pub timestamp: DateTime<Utc>,
}

/// Finest-granularity OHLC bar as persisted in the day-partitioned store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    /// Venue session date, not necessarily the calendar date for
    /// overnight sessions.
    pub trading_day: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_interest: f64,
}

/// Ascending window of bars produced by the history loader, consumed
/// once per strategy initialization
#[derive(Debug, Clone)]
pub struct BarWindow {
    bars: Vec<Bar>,
    target: usize,
}

impl BarWindow {
    pub fn new(bars: Vec<Bar>, target: usize) -> Self {
        Self { bars, target }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Whether the loader found enough history to fill the request
    pub fn is_full(&self) -> bool {
        self.bars.len() >= self.target
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}
