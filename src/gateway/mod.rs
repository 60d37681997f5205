// Order submission boundary
use uuid::Uuid;

use crate::models::{Direction, Offset};

/// Synchronous order submission as seen by the engine.
///
/// The venue-facing implementation lives outside this crate; the paper
/// gateway below is the in-process stand-in for sessions without one.
pub trait OrderGateway: Send {
    /// Submit an order and return the venue order id
    fn submit(
        &mut self,
        symbol: &str,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: f64,
    ) -> anyhow::Result<String>;
}

/// Accepts every order, mints a uuid venue id and logs the submission
#[derive(Debug, Default)]
pub struct PaperGateway {
    accepted: u64,
}

impl PaperGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders accepted so far
    pub fn accepted(&self) -> u64 {
        self.accepted
    }
}

impl OrderGateway for PaperGateway {
    fn submit(
        &mut self,
        symbol: &str,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: f64,
    ) -> anyhow::Result<String> {
        self.accepted += 1;
        let order_id = Uuid::new_v4().to_string();

        tracing::info!(
            %symbol,
            ?direction,
            ?offset,
            price,
            volume,
            %order_id,
            "paper order accepted"
        );

        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_gateway_mints_distinct_ids() {
        let mut gateway = PaperGateway::new();

        let first = gateway
            .submit("rb2410", Direction::Long, Offset::Open, 3600.0, 1.0)
            .unwrap();
        let second = gateway
            .submit("rb2410", Direction::Short, Offset::Close, 3500.0, 1.0)
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(gateway.accepted(), 2);
    }
}
