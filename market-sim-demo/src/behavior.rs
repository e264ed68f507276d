//! Trading strategies that decide, each simulated tick, whether an agent
//! submits an order — ported from a trio of reference strategies: a
//! noise trader, a fixed-spread market maker, and a trend follower.

use market_engine_core::market::Participant;
use market_engine_core::types::{Asset, Order, OrderType, Side};
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use uuid::Uuid;

pub trait Behavior {
    fn decide(&mut self, agent: &Participant, asset: &Asset) -> Option<Order>;
}

fn new_order_id() -> String {
    Uuid::new_v4().to_string()
}

/// Mostly idle, occasionally crosses the mid with a small limit order
/// priced a few ticks off the last trade.
pub struct RandomTrader;

impl Behavior for RandomTrader {
    fn decide(&mut self, agent: &Participant, asset: &Asset) -> Option<Order> {
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() < 0.7 {
            return None;
        }

        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let quantity = Decimal::from(rng.gen_range(1..=10));
        let offer = (asset.last_price + Decimal::from(rng.gen_range(-2..=2))).max(Decimal::ONE);

        if side == Side::Buy && agent.cash < offer * quantity {
            return None;
        }

        Some(Order::new(new_order_id(), side, OrderType::Limit, offer, asset.id, quantity, agent.id))
    }
}

/// Quotes both sides of a fixed spread around the last trade price, one
/// side per tick.
pub struct MarketMaker {
    pub spread: Decimal,
    pub size: Decimal,
}

impl MarketMaker {
    pub fn new(spread: Decimal, size: Decimal) -> Self {
        Self { spread, size }
    }
}

impl Behavior for MarketMaker {
    fn decide(&mut self, agent: &Participant, asset: &Asset) -> Option<Order> {
        let mid = asset.last_price;
        let half = self.spread / Decimal::TWO;
        let buy_price = mid - half;
        let sell_price = mid + half;

        let mut rng = rand::thread_rng();
        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let offer = if side == Side::Buy { buy_price } else { sell_price };

        Some(Order::new(new_order_id(), side, OrderType::Limit, offer, asset.id, self.size, agent.id))
    }
}

/// Tracks the last few trade prices and fires a market order in the
/// direction of the trend once it exceeds a threshold.
pub struct MomentumTrader {
    prices: VecDeque<Decimal>,
    memory: usize,
    threshold: Decimal,
}

impl MomentumTrader {
    pub fn new(memory: usize, threshold: Decimal) -> Self {
        Self {
            prices: VecDeque::with_capacity(memory),
            memory,
            threshold,
        }
    }
}

impl Behavior for MomentumTrader {
    fn decide(&mut self, agent: &Participant, asset: &Asset) -> Option<Order> {
        if self.prices.len() == self.memory {
            self.prices.pop_front();
        }
        self.prices.push_back(asset.last_price);

        if self.prices.len() < 2 {
            return None;
        }

        let momentum = *self.prices.back().unwrap() - *self.prices.front().unwrap();
        if momentum.abs() < self.threshold {
            return None;
        }

        let side = if momentum > Decimal::ZERO { Side::Buy } else { Side::Sell };
        let quantity = Decimal::from(rand::thread_rng().gen_range(1..=5));

        Some(Order::new(
            new_order_id(),
            side,
            OrderType::Market,
            asset.last_price,
            asset.id,
            quantity,
            agent.id,
        ))
    }
}
