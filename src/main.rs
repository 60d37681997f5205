use std::sync::{Arc, Mutex};

use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{sleep, Duration};

use futuresbot::config::Settings;
use futuresbot::db::{BarSource, MemoryBarStore, PostgresBarStore};
use futuresbot::engine::{EngineRuntime, StopEngine};
use futuresbot::feed::{FeedEvent, ReplayFeed, SyntheticBarGenerator};
use futuresbot::gateway::PaperGateway;
use futuresbot::history::BarLoader;
use futuresbot::models::{Direction, Offset};
use futuresbot::strategy::{LoggingStrategy, Strategy};
use futuresbot::Result;

const PAPER_SEED: u64 = 20240603;
const HISTORY_DAYS: u32 = 10;
const BARS_PER_DAY: u32 = 120;
const SESSION_PACE: Duration = Duration::from_millis(25);

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let settings = Settings::load()?;

    tracing::info!("futuresbot starting - paper session");
    tracing::info!("  Symbols: {:?}", settings.symbols);
    tracing::info!(
        "  Init window: {} reporting bars x {} finest bars",
        settings.init_bar_count,
        settings.period_multiple
    );

    let database_url = std::env::var("DATABASE_URL")
        .ok()
        .or_else(|| settings.database_url.clone());

    match database_url {
        Some(url) => {
            let store = Arc::new(PostgresBarStore::new(&url).await?);
            run_session(store, &settings).await
        }
        None => {
            tracing::info!("No DATABASE_URL set, seeding an in-memory bar store");
            let store = Arc::new(seed_memory_store(&settings)?);
            run_session(store, &settings).await
        }
    }
}

/// Seed synthetic history ending yesterday for every configured symbol
fn seed_memory_store(settings: &Settings) -> Result<MemoryBarStore> {
    let store = MemoryBarStore::new();
    let mut generator = SyntheticBarGenerator::new(PAPER_SEED);
    let yesterday = Utc::now().date_naive() - ChronoDuration::days(1);

    for symbol in &settings.symbols {
        let bars = generator.generate_days(symbol, yesterday, HISTORY_DAYS, BARS_PER_DAY);
        store.insert_bars(bars)?;
    }

    Ok(store)
}

async fn run_session<S>(store: Arc<S>, settings: &Settings) -> Result<()>
where
    S: BarSource + 'static,
{
    let loader = BarLoader::new(store.clone());
    let engine = Arc::new(Mutex::new(StopEngine::new(
        PaperGateway::new(),
        settings.bar_cache_size,
    )));
    let mut runtime = EngineRuntime::new(engine.clone(), settings.channel_capacity);

    // Initialization phase: all history loading happens before the first
    // tick flows, off the tick-processing path
    for symbol in &settings.symbols {
        let window = loader
            .get_historical_window(symbol, settings.init_bar_count, settings.period_multiple)
            .await?;

        let mut strategy =
            LoggingStrategy::new(format!("logger-{symbol}"), settings.period_multiple);
        strategy.on_init(&window);

        let last_close = window.bars().last().map(|bar| bar.close);

        {
            let mut engine = engine.lock().unwrap();
            engine.register_strategy(symbol.clone(), Box::new(strategy));

            // Demo arming so the paper session exercises the trigger
            // path: a breakout buy stop, a breakdown sell stop and a
            // far-away price alarm
            if let Some(close) = last_close {
                engine.place_stop_order(
                    symbol.clone(),
                    Direction::Long,
                    Offset::Open,
                    close * 1.002,
                    1.0,
                )?;
                engine.place_stop_order(
                    symbol.clone(),
                    Direction::Short,
                    Offset::Open,
                    close * 0.998,
                    1.0,
                )?;
                engine.place_stop_order(
                    symbol.clone(),
                    Direction::Long,
                    Offset::Open,
                    close * 1.05,
                    0.0,
                )?;
            }
        }

        runtime.subscribe(symbol);
    }

    // Paper "live" feed: one synthetic session per symbol, replayed at a
    // steady pace through the same channels a live gateway would use
    let today = Utc::now().date_naive();
    let mut generator = SyntheticBarGenerator::new(PAPER_SEED + 1);
    let mut feeds: Vec<ReplayFeed> = settings
        .symbols
        .iter()
        .map(|symbol| {
            ReplayFeed::new(
                generator.generate_days(symbol, today, 1, BARS_PER_DAY),
                settings.limit_ratio,
            )
        })
        .collect();

    loop {
        let mut exhausted = true;

        for feed in &mut feeds {
            if let Some((tick, bar)) = feed.next() {
                exhausted = false;
                runtime.dispatch(FeedEvent::Tick(tick)).await;
                runtime.dispatch(FeedEvent::Bar(bar)).await;
            }
        }

        if exhausted {
            break;
        }
        sleep(SESSION_PACE).await;
    }

    runtime.shutdown().await;

    let engine = engine.lock().unwrap();
    for symbol in &settings.symbols {
        tracing::info!(
            %symbol,
            pending = engine.pending_stop_orders(symbol).len(),
            cached_bars = engine.recent_bars(symbol, settings.bar_cache_size).len(),
            "session summary"
        );
    }
    tracing::info!(
        orders_accepted = engine.gateway().accepted(),
        "paper session complete"
    );

    Ok(())
}
