//! Property-based tests for the order book's structural invariants (spec
//! §8): AVL balance, book/index agreement, empty-level garbage collection,
//! time priority, price priority for market orders, residual resting, and
//! cancel round-trips. Driven directly against `OrderBook` — these don't
//! need a `Market`/`Participant` since they're about the ladder/index/
//! matcher's own bookkeeping, not settlement.

use market_engine_core::types::{AssetId, Order, OrderType, ParticipantId, Price, Quantity, Side};
use market_engine_core::OrderBook;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn price_strategy() -> impl Strategy<Value = Price> {
    (90i64..=110i64).prop_map(Decimal::from)
}

fn qty_strategy() -> impl Strategy<Value = Quantity> {
    (1i64..=20i64).prop_map(Decimal::from)
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn order_at(n: usize, side: Side, price: Price, qty: Quantity) -> Order {
    Order::new(format!("o{n}"), side, OrderType::Limit, price, AssetId::new(), qty, ParticipantId::new())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// After any sequence of resting limit inserts, both ladders stay
    /// AVL-balanced and every id in the index still resolves through
    /// `get_order` (spec invariants 1 and 4).
    #[test]
    fn balance_and_index_agreement_hold_after_any_insert_sequence(
        orders in prop::collection::vec((side_strategy(), price_strategy(), qty_strategy()), 1..60)
    ) {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);

        for (n, (side, price, qty)) in orders.into_iter().enumerate() {
            let order = Order::new(format!("o{n}"), side, OrderType::Limit, price, asset, qty, ParticipantId::new());
            let _ = book.match_order(order);

            prop_assert!(book.bids_balanced(), "bid ladder unbalanced");
            prop_assert!(book.asks_balanced(), "ask ladder unbalanced");

            for id in book.indexed_ids() {
                prop_assert!(book.get_order(&id).is_some(), "indexed id {id} does not resolve through the ladder");
            }
        }
    }

    /// No ladder ever reports a price level with zero resting quantity
    /// (spec invariant 2 / empty-level GC).
    #[test]
    fn top_levels_are_never_reported_with_zero_quantity(
        orders in prop::collection::vec((side_strategy(), price_strategy(), qty_strategy()), 1..60)
    ) {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);

        for (n, (side, price, qty)) in orders.into_iter().enumerate() {
            let order = order_at(n, side, price, qty);
            let _ = book.match_order(order);
        }

        for (_, qty) in book.top_bids(1000) {
            prop_assert!(qty > Quantity::ZERO);
        }
        for (_, qty) in book.top_asks(1000) {
            prop_assert!(qty > Quantity::ZERO);
        }
    }

    /// At a single price level, a partial market sweep consumes the
    /// earliest-submitted resting orders first (spec invariant 5 / time
    /// priority).
    #[test]
    fn time_priority_drains_resting_orders_in_submission_order(
        quantities in prop::collection::vec(1i64..10i64, 3..8),
        take_fraction in 0.1f64..0.9f64,
    ) {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);
        let price = Decimal::from(100);

        let mut ids = Vec::new();
        for (n, qty) in quantities.iter().enumerate() {
            let id = format!("resting{n}");
            book.insert(Order::new(id.clone(), Side::Sell, OrderType::Limit, price, asset, Decimal::from(*qty), ParticipantId::new()))
                .unwrap();
            ids.push(id);
        }

        let total: i64 = quantities.iter().sum();
        let take = ((total as f64) * take_fraction).floor().max(1.0) as i64;
        prop_assume!(take < total);

        let taker = Order::new("taker".into(), Side::Buy, OrderType::Market, Decimal::ZERO, asset, Decimal::from(take), ParticipantId::new());
        let (_, trades) = book.match_order(taker).unwrap();

        // The makers that appear in trades, in order, must be a prefix of
        // the submission order — time priority within one price level.
        let mut remaining_take = take;
        for (id, qty) in ids.iter().zip(quantities.iter()) {
            if remaining_take <= 0 {
                prop_assert!(book.get_order(id).is_some(), "order {id} should still be resting untouched");
                continue;
            }
            let consumed = (*qty).min(remaining_take);
            remaining_take -= consumed;
            if consumed == *qty {
                prop_assert!(book.get_order(id).is_none(), "fully consumed maker {id} should be gone");
            } else {
                let resting = book.get_order(id).unwrap();
                prop_assert_eq!(resting.remaining, Decimal::from(*qty - consumed));
            }
        }
        let _ = trades;
    }

    /// A buy market order's executed prices are non-decreasing; a sell
    /// market order's are non-increasing (spec invariant 6 / price
    /// priority).
    #[test]
    fn market_order_executed_prices_respect_price_priority(
        side in side_strategy(),
        level_prices in prop::collection::hash_set(90i64..=110i64, 2..6),
    ) {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);
        let maker_side = side.opposite();
        let per_level_qty = Decimal::from(3);

        let mut sorted: Vec<i64> = level_prices.into_iter().collect();
        sorted.sort();
        for (n, price) in sorted.iter().enumerate() {
            book.insert(Order::new(format!("m{n}"), maker_side, OrderType::Limit, Decimal::from(*price), asset, per_level_qty, ParticipantId::new()))
                .unwrap();
        }

        let total_qty = per_level_qty * Decimal::from(sorted.len() as i64);
        let taker = Order::new("taker".into(), side, OrderType::Market, Decimal::ZERO, asset, total_qty, ParticipantId::new());
        let (_, trades) = book.match_order(taker).unwrap();

        let prices: Vec<Price> = trades.iter().map(|t| t.price).collect();
        for window in prices.windows(2) {
            if side == Side::Buy {
                prop_assert!(window[0] <= window[1], "buy market executed out of ascending price order: {:?}", prices);
            } else {
                prop_assert!(window[0] >= window[1], "sell market executed out of descending price order: {:?}", prices);
            }
        }
    }

    /// A limit order's unfilled residual always rests at exactly its own
    /// offer price with the expected leftover quantity (spec invariant 9).
    #[test]
    fn limit_residual_rests_with_exact_leftover_quantity(
        maker_qty in qty_strategy(),
        taker_qty in qty_strategy(),
    ) {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);
        let price = Decimal::from(100);

        book.insert(Order::new("maker".into(), Side::Sell, OrderType::Limit, price, asset, maker_qty, ParticipantId::new()))
            .unwrap();
        let taker = Order::new("taker".into(), Side::Buy, OrderType::Limit, price, asset, taker_qty, ParticipantId::new());
        book.match_order(taker).unwrap();

        if maker_qty > taker_qty {
            let maker = book.get_order("maker").unwrap();
            prop_assert_eq!(maker.remaining, maker_qty - taker_qty);
            prop_assert!(book.get_order("taker").is_none());
        } else if taker_qty > maker_qty {
            prop_assert!(book.get_order("maker").is_none());
            let taker = book.get_order("taker").unwrap();
            prop_assert_eq!(taker.remaining, taker_qty - maker_qty);
            prop_assert_eq!(taker.offer, price);
        } else {
            prop_assert!(book.get_order("maker").is_none());
            prop_assert!(book.get_order("taker").is_none());
        }
    }

    /// Inserting then canceling an order returns the book to empty, for
    /// any price/quantity/side (spec invariant 10).
    #[test]
    fn cancel_after_insert_restores_empty_book(
        side in side_strategy(),
        price in price_strategy(),
        qty in qty_strategy(),
    ) {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);
        book.insert(Order::new("o".into(), side, OrderType::Limit, price, asset, qty, ParticipantId::new()))
            .unwrap();

        prop_assert!(book.cancel("o").unwrap());
        prop_assert!(book.is_empty());
        prop_assert!(book.indexed_ids().is_empty());
        prop_assert!(book.bids_balanced());
        prop_assert!(book.asks_balanced());
        prop_assert!(!book.cancel("o").unwrap(), "second cancel of the same id must fail");
    }
}
