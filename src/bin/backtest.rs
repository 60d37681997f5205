use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::Parser;

use futuresbot::db::{BarSource, MemoryBarStore, PostgresBarStore};
use futuresbot::engine::StopEngine;
use futuresbot::feed::{ReplayFeed, SyntheticBarGenerator};
use futuresbot::gateway::PaperGateway;
use futuresbot::history::BarLoader;
use futuresbot::models::{Bar, BarWindow, Direction, Offset};
use futuresbot::strategy::{LoggingStrategy, Strategy};
use futuresbot::{Result, TriggeredStop};

const SYNTHETIC_BARS_PER_DAY: u32 = 120;

/// Replay stored bars through the stop engine and report every fill
#[derive(Parser, Debug)]
#[command(name = "backtest")]
struct Args {
    /// Symbol to replay
    #[arg(long, default_value = "rb2410")]
    symbol: String,

    /// Reporting bars to preload before the replay starts
    #[arg(long, default_value_t = 50)]
    init_bars: usize,

    /// Finest bars per reporting bar
    #[arg(long, default_value_t = 15)]
    period_multiple: usize,

    /// Finest bars to replay through the engine after the preload
    #[arg(long, default_value_t = 240)]
    replay_bars: usize,

    /// Daily price band for synthesized tick limits
    #[arg(long, default_value_t = 0.1)]
    limit_ratio: f64,

    /// Anchor date (YYYY-MM-DD) for the history scan, defaults to today
    #[arg(long)]
    anchor: Option<NaiveDate>,

    /// Breakout buy-stop trigger prices to arm (open long)
    #[arg(long = "buy-stop")]
    buy_stops: Vec<f64>,

    /// Breakdown sell-stop trigger prices to arm (open short)
    #[arg(long = "sell-stop")]
    sell_stops: Vec<f64>,

    /// Protective stops that sell out of a long at or below the price
    #[arg(long = "long-exit")]
    long_exits: Vec<f64>,

    /// Protective stops that buy back a short at or above the price
    #[arg(long = "short-exit")]
    short_exits: Vec<f64>,

    /// Volume for each armed stop
    #[arg(long, default_value_t = 1.0)]
    volume: f64,

    /// Seed for the synthetic store used when DATABASE_URL is unset
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Emit the fills as JSON instead of the plain-text report
    #[arg(long)]
    json: bool,
}

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

    let args = Args::parse();
    let anchor = args.anchor.unwrap_or_else(|| Utc::now().date_naive());

    let bars = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = Arc::new(PostgresBarStore::new(&url).await?);
            load_bars(store, &args, anchor).await?
        }
        Err(_) => {
            tracing::info!("No DATABASE_URL set, replaying a synthetic series");
            let store = Arc::new(synthetic_store(&args, anchor)?);
            load_bars(store, &args, anchor).await?
        }
    };

    if bars.is_empty() {
        return Err(format!("no history found for {}", args.symbol).into());
    }

    let fills = replay(&args, bars)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&fills)?);
    } else {
        report(&fills);
    }

    Ok(())
}

fn synthetic_store(args: &Args, anchor: NaiveDate) -> Result<MemoryBarStore> {
    let needed = args.init_bars * args.period_multiple + args.replay_bars;
    let days = (needed as u32).div_ceil(SYNTHETIC_BARS_PER_DAY) + 1;

    let store = MemoryBarStore::new();
    let mut generator = SyntheticBarGenerator::new(args.seed);
    store.insert_bars(generator.generate_days(&args.symbol, anchor, days, SYNTHETIC_BARS_PER_DAY))?;

    Ok(store)
}

async fn load_bars<S>(store: Arc<S>, args: &Args, anchor: NaiveDate) -> Result<Vec<Bar>>
where
    S: BarSource + 'static,
{
    let loader = BarLoader::new(store).with_anchor(anchor);

    // One request covers warmup and replay so both come from a single
    // period-aligned scan
    let total_reporting = args.init_bars + args.replay_bars.div_ceil(args.period_multiple);
    let bars = loader
        .load(&args.symbol, total_reporting, args.period_multiple)
        .await?;

    Ok(bars)
}

fn replay(args: &Args, bars: Vec<Bar>) -> Result<Vec<TriggeredStop>> {
    let split = bars.len().saturating_sub(args.replay_bars);
    let (warmup, session) = bars.split_at(split);

    let mut engine = StopEngine::new(PaperGateway::new(), warmup.len() + session.len());

    let mut strategy = LoggingStrategy::new(format!("backtest-{}", args.symbol), args.period_multiple);
    strategy.on_init(&BarWindow::new(
        warmup.to_vec(),
        args.init_bars * args.period_multiple,
    ));
    engine.register_strategy(args.symbol.clone(), Box::new(strategy));

    for price in &args.buy_stops {
        engine.place_stop_order(&args.symbol, Direction::Long, Offset::Open, *price, args.volume)?;
    }
    for price in &args.sell_stops {
        engine.place_stop_order(&args.symbol, Direction::Short, Offset::Open, *price, args.volume)?;
    }
    for price in &args.long_exits {
        engine.place_stop_order(&args.symbol, Direction::Short, Offset::Close, *price, args.volume)?;
    }
    for price in &args.short_exits {
        engine.place_stop_order(&args.symbol, Direction::Long, Offset::Close, *price, args.volume)?;
    }

    tracing::info!(
        warmup = warmup.len(),
        session = session.len(),
        pending = engine.pending_stop_orders(&args.symbol).len(),
        "starting replay"
    );

    let mut fills = Vec::new();
    for (tick, bar) in ReplayFeed::new(session.to_vec(), args.limit_ratio) {
        fills.extend(engine.process_tick(&tick)?);
        engine.process_bar(&bar);
    }

    Ok(fills)
}

fn report(fills: &[TriggeredStop]) {
    if fills.is_empty() {
        println!("No stop orders triggered.");
        return;
    }

    println!("Triggered stop orders (emission order):");
    for fill in fills {
        println!(
            "  #{:<4} {:?} {:?} {} trigger={:.2} fill={:.2} venue={}",
            fill.order.id,
            fill.order.direction,
            fill.order.offset,
            fill.order.symbol,
            fill.order.trigger_price,
            fill.fill_price,
            fill.venue_order_id.as_deref().unwrap_or("-"),
        );
    }
    println!("Total: {} fills", fills.len());
}
