//! Runs a population of trading agents against one asset's order book for
//! a fixed number of ticks, logging each submitted order and the trades
//! it produces.

mod behavior;

use behavior::{Behavior, MarketMaker, MomentumTrader, RandomTrader};
use clap::Parser;
use market_engine_core::market::Participant;
use market_engine_core::types::{Asset, AssetId, ParticipantId};
use market_engine_core::Market;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

/// Configuration for one simulation run. No file or environment config —
/// everything the run needs comes in on the command line.
#[derive(Parser)]
#[command(name = "market-sim-demo")]
#[command(about = "Runs a population of trading agents against a simulated order book")]
struct SimConfig {
    /// Number of simulated ticks to run
    #[arg(long, default_value_t = 200)]
    steps: u32,

    /// Number of noise (random) traders
    #[arg(long, default_value_t = 3)]
    random_traders: u32,

    /// Number of market-maker traders
    #[arg(long, default_value_t = 2)]
    market_makers: u32,

    /// Number of momentum traders
    #[arg(long, default_value_t = 1)]
    momentum_traders: u32,

    /// Starting cash for each agent
    #[arg(long, default_value = "5000")]
    starting_cash: Decimal,

    /// Starting (last trade) price for the traded asset
    #[arg(long, default_value = "100")]
    starting_price: Decimal,

    /// Dump the full trade tape as JSON when the run finishes
    #[arg(long, default_value_t = false)]
    dump_history: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SimConfig::parse();

    let mut market = Market::new();
    let asset_id = market
        .add_asset(Asset::new("BTC", config.starting_price, dec!(0)))
        .expect("fresh market accepts its first asset");

    let mut agents: Vec<(ParticipantId, Box<dyn Behavior>)> = Vec::new();

    for _ in 0..config.random_traders {
        let id = market.add_participant(Participant::new(config.starting_cash));
        seed_holding(&mut market, id, asset_id, dec!(50));
        agents.push((id, Box::new(RandomTrader)));
    }

    for _ in 0..config.market_makers {
        let id = market.add_participant(Participant::new(config.starting_cash * dec!(4)));
        seed_holding(&mut market, id, asset_id, dec!(200));
        agents.push((id, Box::new(MarketMaker::new(dec!(2), dec!(5)))));
    }

    for _ in 0..config.momentum_traders {
        let id = market.add_participant(Participant::new(config.starting_cash * dec!(2)));
        seed_holding(&mut market, id, asset_id, dec!(100));
        agents.push((id, Box::new(MomentumTrader::new(5, dec!(1)))));
    }

    info!(asset = %asset_id, ticks = config.steps, agents = agents.len(), "starting simulation");

    for tick in 0..config.steps {
        for (agent_id, behavior) in agents.iter_mut() {
            let asset = market.asset(asset_id).expect("asset is listed for the run's duration").clone();
            let participant = market
                .participant(*agent_id)
                .expect("agent was registered before the run started")
                .clone();

            let Some(order) = behavior.decide(&participant, &asset) else {
                continue;
            };

            let order_type = order.order_type;
            let side = order.side;
            match market.submit(asset_id, *agent_id, order) {
                Ok(status) => {
                    info!(tick, agent = %agent_id, ?side, ?order_type, ?status, "order submitted");
                }
                Err(err) => {
                    warn!(tick, agent = %agent_id, %err, "order rejected");
                }
            }
        }
    }

    let asset = market.asset(asset_id).unwrap();
    info!(
        last_price = %asset.last_price,
        trades = market.history().len(),
        "simulation complete"
    );

    if config.dump_history {
        match serde_json::to_string_pretty(market.history()) {
            Ok(json) => println!("{json}"),
            Err(err) => warn!(%err, "failed to serialize trade history"),
        }
    }
}

fn seed_holding(market: &mut Market, id: ParticipantId, asset_id: AssetId, quantity: Decimal) {
    market
        .participant_mut(id)
        .expect("participant was just registered")
        .holdings
        .insert(asset_id, quantity);
}
