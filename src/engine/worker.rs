use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::StopEngine;
use crate::feed::FeedEvent;
use crate::gateway::OrderGateway;

/// Symbol-partitioned runtime around a shared engine.
///
/// Each subscribed symbol gets one worker task draining a bounded
/// channel, so evaluation, sorting and submission for one tick complete
/// before the next tick of that symbol is accepted, while distinct
/// symbols proceed concurrently. No ordering holds across symbols, and
/// none is needed.
pub struct EngineRuntime<G: OrderGateway + Send + 'static> {
    engine: Arc<Mutex<StopEngine<G>>>,
    senders: HashMap<String, mpsc::Sender<FeedEvent>>,
    workers: Vec<JoinHandle<()>>,
    channel_capacity: usize,
}

impl<G: OrderGateway + Send + 'static> EngineRuntime<G> {
    pub fn new(engine: Arc<Mutex<StopEngine<G>>>, channel_capacity: usize) -> Self {
        Self {
            engine,
            senders: HashMap::new(),
            workers: Vec::new(),
            channel_capacity,
        }
    }

    /// Spawn the worker for a symbol and return its feed sender.
    ///
    /// Re-subscribing replaces the sender; the old worker drains its
    /// remaining events and exits once its channel closes.
    pub fn subscribe(&mut self, symbol: &str) -> mpsc::Sender<FeedEvent> {
        let (tx, mut rx) = mpsc::channel(self.channel_capacity);
        let engine = self.engine.clone();
        let worker_symbol = symbol.to_string();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let mut engine = engine.lock().unwrap();
                match event {
                    FeedEvent::Tick(tick) => {
                        if let Err(err) = engine.process_tick(&tick) {
                            tracing::error!(symbol = %worker_symbol, %err, "tick batch aborted");
                        }
                    }
                    FeedEvent::Bar(bar) => engine.process_bar(&bar),
                }
            }

            tracing::debug!(symbol = %worker_symbol, "feed channel closed, worker exiting");
        });

        tracing::info!(%symbol, "subscribed");

        self.workers.push(handle);
        self.senders.insert(symbol.to_string(), tx.clone());
        tx
    }

    pub fn sender(&self, symbol: &str) -> Option<mpsc::Sender<FeedEvent>> {
        self.senders.get(symbol).cloned()
    }

    /// Route one event to its symbol's worker. Events for unsubscribed
    /// symbols are dropped with a warning.
    pub async fn dispatch(&self, event: FeedEvent) {
        match self.senders.get(event.symbol()) {
            Some(tx) => {
                if tx.send(event).await.is_err() {
                    tracing::warn!("worker gone, feed event dropped");
                }
            }
            None => {
                tracing::warn!(symbol = %event.symbol(), "feed event for unsubscribed symbol dropped")
            }
        }
    }

    pub fn engine(&self) -> Arc<Mutex<StopEngine<G>>> {
        self.engine.clone()
    }

    /// Close all feed channels and wait for the workers to drain
    pub async fn shutdown(mut self) {
        self.senders.clear();
        for handle in self.workers.drain(..) {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::PaperGateway;
    use crate::models::{Direction, Offset, Tick};
    use chrono::Utc;

    fn create_test_tick(symbol: &str, last_price: f64) -> Tick {
        Tick {
            symbol: symbol.to_string(),
            last_price,
            upper_limit: last_price * 1.1,
            lower_limit: last_price * 0.9,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_workers_process_their_own_symbols() {
        let engine = Arc::new(Mutex::new(StopEngine::new(PaperGateway::new(), 100)));
        let mut runtime = EngineRuntime::new(engine.clone(), 16);

        {
            let mut engine = engine.lock().unwrap();
            engine
                .place_stop_order("rb2410", Direction::Long, Offset::Open, 3550.0, 1.0)
                .unwrap();
            engine
                .place_stop_order("cu2408", Direction::Long, Offset::Open, 80000.0, 1.0)
                .unwrap();
        }

        runtime.subscribe("rb2410");
        runtime.subscribe("cu2408");

        runtime
            .dispatch(FeedEvent::Tick(create_test_tick("rb2410", 3600.0)))
            .await;
        runtime
            .dispatch(FeedEvent::Tick(create_test_tick("cu2408", 78000.0)))
            .await;

        runtime.shutdown().await;

        let engine = engine.lock().unwrap();
        // The rb2410 stop fired; the cu2408 one was not reached
        assert!(engine.pending_stop_orders("rb2410").is_empty());
        assert_eq!(engine.pending_stop_orders("cu2408").len(), 1);
    }

    #[tokio::test]
    async fn test_ticks_drain_in_order() {
        let engine = Arc::new(Mutex::new(StopEngine::new(PaperGateway::new(), 100)));
        let mut runtime = EngineRuntime::new(engine.clone(), 64);

        {
            let mut engine = engine.lock().unwrap();
            for i in 0..10 {
                engine
                    .place_stop_order(
                        "rb2410",
                        Direction::Long,
                        Offset::Open,
                        3600.0 + i as f64,
                        1.0,
                    )
                    .unwrap();
            }
        }

        runtime.subscribe("rb2410");

        // Walk the price up one stop at a time
        for i in 0..10 {
            runtime
                .dispatch(FeedEvent::Tick(create_test_tick("rb2410", 3600.0 + i as f64)))
                .await;
        }

        runtime.shutdown().await;

        let engine = engine.lock().unwrap();
        assert!(engine.pending_stop_orders("rb2410").is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribed_symbol_is_dropped() {
        let engine = Arc::new(Mutex::new(StopEngine::new(PaperGateway::new(), 100)));
        let runtime = EngineRuntime::new(engine.clone(), 16);

        // No subscription: dispatch must not panic or block
        runtime
            .dispatch(FeedEvent::Tick(create_test_tick("rb2410", 3600.0)))
            .await;

        runtime.shutdown().await;
    }
}
