// Tick and bar sources (replay, synthetic)
pub mod replay;
pub mod synthetic;

pub use replay::ReplayFeed;
pub use synthetic::SyntheticBarGenerator;

use crate::models::{Bar, Tick};

/// One event delivered to a symbol worker.
///
/// Live and replayed sources produce the same type, so the engine cannot
/// tell them apart; that is the live/backtest parity requirement.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Tick(Tick),
    Bar(Bar),
}

impl FeedEvent {
    pub fn symbol(&self) -> &str {
        match self {
            FeedEvent::Tick(tick) => &tick.symbol,
            FeedEvent::Bar(bar) => &bar.symbol,
        }
    }
}
