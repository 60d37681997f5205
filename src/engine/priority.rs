use std::cmp::Ordering;

use crate::error::EngineError;
use crate::models::{Direction, Offset, StopOrder};

/// The four emission categories, named for the position an order acts
/// on: `ShortClose` buys back a short, `LongClose` sells out of a long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOrderCategory {
    ShortClose,
    LongClose,
    LongOpen,
    ShortOpen,
}

impl StopOrderCategory {
    pub fn of(order: &StopOrder) -> Self {
        match (order.direction, order.offset) {
            (Direction::Long, Offset::Open) => Self::LongOpen,
            (Direction::Long, Offset::Close) => Self::ShortClose,
            (Direction::Short, Offset::Open) => Self::ShortOpen,
            (Direction::Short, Offset::Close) => Self::LongClose,
        }
    }
}

/// Order a triggered batch for emission.
///
/// Categories are sorted independently, one explicit comparator each
/// (price direction x sequence direction), then concatenated in the
/// fixed order short-close, long-close, long-open, short-open:
/// risk-reducing orders resolve before risk-adding ones within the same
/// tick, and covering shorts precede exiting longs. The result depends
/// only on the batch itself, never on its input order, so live and
/// replay runs emit identical sequences.
///
/// A batch containing a non-finite trigger price or volume cannot be
/// ordered deterministically and aborts whole, before any order is
/// applied.
pub fn sort_for_emission(batch: Vec<StopOrder>) -> Result<Vec<StopOrder>, EngineError> {
    for order in &batch {
        if !order.trigger_price.is_finite() || !order.volume.is_finite() {
            return Err(EngineError::Configuration(format!(
                "stop order {} has a non-finite trigger price or volume",
                order.id
            )));
        }
    }

    let mut short_close = Vec::new();
    let mut long_close = Vec::new();
    let mut long_open = Vec::new();
    let mut short_open = Vec::new();

    for order in batch {
        match StopOrderCategory::of(&order) {
            StopOrderCategory::ShortClose => short_close.push(order),
            StopOrderCategory::LongClose => long_close.push(order),
            StopOrderCategory::LongOpen => long_open.push(order),
            StopOrderCategory::ShortOpen => short_open.push(order),
        }
    }

    short_close.sort_by(|a, b| price_asc(a, b).then(seq_desc(a, b)));
    long_close.sort_by(|a, b| price_desc(a, b).then(seq_asc(a, b)));
    long_open.sort_by(|a, b| price_asc(a, b).then(seq_asc(a, b)));
    short_open.sort_by(|a, b| price_desc(a, b).then(seq_desc(a, b)));

    let mut ordered = short_close;
    ordered.append(&mut long_close);
    ordered.append(&mut long_open);
    ordered.append(&mut short_open);

    Ok(ordered)
}

fn price_asc(a: &StopOrder, b: &StopOrder) -> Ordering {
    a.trigger_price.total_cmp(&b.trigger_price)
}

fn price_desc(a: &StopOrder, b: &StopOrder) -> Ordering {
    b.trigger_price.total_cmp(&a.trigger_price)
}

fn seq_asc(a: &StopOrder, b: &StopOrder) -> Ordering {
    a.sequence.cmp(&b.sequence)
}

fn seq_desc(a: &StopOrder, b: &StopOrder) -> Ordering {
    b.sequence.cmp(&a.sequence)
}
