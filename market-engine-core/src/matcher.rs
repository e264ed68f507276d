//! Dispatches an incoming order to the matching strategy for its
//! `(OrderType, Side)` pair and runs the within-level fill loop.
//!
//! `GoodTillCancel` never reaches this module: [`OrderBook::match_order`]
//! routes it straight to `insert` before dispatch. Everything here mutates
//! the taker order's `remaining`/`status` in place and returns the trades
//! it produced; the order book inserts any eligible residual afterward.

use crate::order_book::OrderBook;
use crate::price_level::PriceLevel;
use crate::types::{Order, OrderId, OrderStatus, OrderType, Quantity, Side, Trade, Trades};

/// Entry point used by [`OrderBook::match_order`]. `order.order_type` is
/// always `Market` or `Limit` here.
pub(crate) fn dispatch(book: &mut OrderBook, order: &mut Order) -> Trades {
    match order.order_type {
        OrderType::Market => match_market(book, order),
        OrderType::Limit => match_limit_strict(book, order),
        OrderType::GoodTillCancel => unreachable!("GoodTillCancel is routed around the matcher"),
    }
}

/// Entry point used by [`OrderBook::match_order_crossing`].
pub(crate) fn dispatch_crossing(book: &mut OrderBook, order: &mut Order) -> Trades {
    match order.order_type {
        OrderType::Market => match_market(book, order),
        OrderType::Limit => match_limit_crossing(book, order),
        OrderType::GoodTillCancel => unreachable!("GoodTillCancel is routed around the matcher"),
    }
}

/// Sweeps the opposing ladder in price priority (best price first) until
/// the order is filled or the ladder is exhausted. A market order that
/// still has quantity left over — whether the opposing book started empty
/// or ran dry mid-sweep — is explicitly marked `Canceled` and never rests.
fn match_market(book: &mut OrderBook, taker: &mut Order) -> Trades {
    let opposing = taker.side.opposite();
    let ascending = taker.side == Side::Buy;
    let mut trades = Vec::new();

    if book.ladder(opposing).is_empty() {
        taker.status = OrderStatus::Canceled;
        return trades;
    }

    loop {
        if taker.remaining.is_zero() {
            taker.status = OrderStatus::Filled;
            break;
        }

        let best_price = if ascending {
            book.ladder(opposing).min().map(PriceLevel::price)
        } else {
            book.ladder(opposing).max().map(PriceLevel::price)
        };

        let Some(price) = best_price else {
            taker.status = OrderStatus::Canceled;
            break;
        };

        let (became_empty, filled_ids) = {
            let level = book
                .ladder_mut(opposing)
                .search_mut(price)
                .expect("best price read from the ladder must resolve to a level");
            fill_level(level, taker, &mut trades)
        };
        for id in filled_ids {
            book.deindex(&id);
        }
        if became_empty {
            book.ladder_mut(opposing).delete(price);
        }
    }

    trades
}

/// Matches only the opposing level sitting at the taker's exact offer
/// price — a strict price match, not a crossing sweep. Any residual is
/// left `Waiting` for the caller to rest on the taker's own side.
fn match_limit_strict(book: &mut OrderBook, taker: &mut Order) -> Trades {
    let opposing = taker.side.opposite();
    let price = taker.offer;
    let mut trades = Vec::new();

    let outcome = {
        let Some(level) = book.ladder_mut(opposing).search_mut(price) else {
            return trades;
        };
        fill_level(level, taker, &mut trades)
    };

    let (became_empty, filled_ids) = outcome;
    for id in filled_ids {
        book.deindex(&id);
    }
    if became_empty {
        book.ladder_mut(opposing).delete(price);
    }

    if taker.remaining.is_zero() {
        taker.status = OrderStatus::Filled;
    }

    trades
}

/// Price-crossing limit match: sweeps the opposing ladder in price
/// priority as long as each level's price still crosses the taker's
/// offer. Exposed separately from [`match_limit_strict`] since it departs
/// from the book's default strict-price-match semantics.
fn match_limit_crossing(book: &mut OrderBook, taker: &mut Order) -> Trades {
    let opposing = taker.side.opposite();
    let ascending = taker.side == Side::Buy;
    let mut trades = Vec::new();

    loop {
        if taker.remaining.is_zero() {
            taker.status = OrderStatus::Filled;
            break;
        }

        let best_price = if ascending {
            book.ladder(opposing).min().map(PriceLevel::price)
        } else {
            book.ladder(opposing).max().map(PriceLevel::price)
        };

        let Some(price) = best_price else { break };

        let crosses = if ascending { price <= taker.offer } else { price >= taker.offer };
        if !crosses {
            break;
        }

        let (became_empty, filled_ids) = {
            let level = book
                .ladder_mut(opposing)
                .search_mut(price)
                .expect("best price read from the ladder must resolve to a level");
            fill_level(level, taker, &mut trades)
        };
        for id in filled_ids {
            book.deindex(&id);
        }
        if became_empty {
            book.ladder_mut(opposing).delete(price);
        }
    }

    trades
}

/// Drains `taker`'s remaining quantity against the FIFO queue at one
/// price level, oldest resting order first, until the taker is filled or
/// the level runs dry. Returns whether the level is now empty and the ids
/// of any makers fully consumed (for the caller to remove from the book's
/// id-index once the level borrow has ended).
fn fill_level(level: &mut PriceLevel, taker: &mut Order, trades: &mut Trades) -> (bool, Vec<OrderId>) {
    let mut filled_ids = Vec::new();

    loop {
        if taker.remaining.is_zero() {
            break;
        }
        let Some(handle) = level.front_handle() else { break };

        let (maker_price, maker_remaining, maker_id, maker_submitter) = {
            let maker = level.order(handle).expect("front handle names a live order");
            (maker.offer, maker.remaining, maker.id.clone(), maker.submitter)
        };

        let (buyer, seller) = match taker.side {
            Side::Buy => (taker.submitter, maker_submitter),
            Side::Sell => (maker_submitter, taker.submitter),
        };

        if maker_remaining >= taker.remaining {
            let trade_qty = taker.remaining;
            trades.push(Trade::new(taker.asset_id, buyer, seller, trade_qty, maker_price));

            level
                .order_mut(handle)
                .expect("front handle names a live order")
                .remaining -= trade_qty;
            level.shrink_by(trade_qty);
            taker.remaining = Quantity::ZERO;

            if maker_remaining == trade_qty {
                level
                    .order_mut(handle)
                    .expect("front handle names a live order")
                    .status = OrderStatus::Filled;
                level.unlink(handle);
                filled_ids.push(maker_id);
            }
            break;
        } else {
            let trade_qty = maker_remaining;
            trades.push(Trade::new(taker.asset_id, buyer, seller, trade_qty, maker_price));
            taker.remaining -= trade_qty;

            let mut removed = level.unlink(handle).expect("front handle names a live order");
            removed.remaining = Quantity::ZERO;
            removed.status = OrderStatus::Filled;
            filled_ids.push(maker_id);
        }
    }

    (level.is_empty(), filled_ids)
}
