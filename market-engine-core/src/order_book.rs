//! A single asset's pair of price ladders (bid, ask) plus the id-index that
//! lets `cancel` locate a resting order in O(log n + 1).

use crate::avl::AvlTree;
use crate::matcher;
use crate::price_level::{NodeHandle, PriceLevel};
use crate::types::{AssetId, Order, OrderBookError, OrderId, OrderStatus, OrderType, Price, Quantity, Side, Trades};
use std::collections::HashMap;
use tracing::{error, trace};

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    side: Side,
    price: Price,
    handle: NodeHandle,
}

/// A limit order book for one asset: two AVL-ordered price ladders and an
/// order-id index for O(log n + 1) cancellation.
pub struct OrderBook {
    asset_id: AssetId,
    bids: AvlTree<PriceLevel>,
    asks: AvlTree<PriceLevel>,
    index: HashMap<OrderId, IndexEntry>,
}

impl OrderBook {
    pub fn new(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            bids: AvlTree::new(),
            asks: AvlTree::new(),
            index: HashMap::new(),
        }
    }

    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    pub(crate) fn ladder(&self, side: Side) -> &AvlTree<PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub(crate) fn ladder_mut(&mut self, side: Side) -> &mut AvlTree<PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub(crate) fn deindex(&mut self, order_id: &str) {
        self.index.remove(order_id);
    }

    fn check_asset(&self, order: &Order) -> Result<(), OrderBookError> {
        if order.asset_id != self.asset_id {
            return Err(OrderBookError::AssetMismatch {
                order_asset: order.asset_id,
                book_asset: self.asset_id,
            });
        }
        Ok(())
    }

    /// Places `order` directly on its own side of the book, with no
    /// matching attempt. Used both for resting `GoodTillCancel` orders and
    /// for the residual of a partially-filled limit order.
    pub fn insert(&mut self, order: Order) -> Result<(), OrderBookError> {
        self.check_asset(&order)?;
        if self.index.contains_key(&order.id) {
            return Err(OrderBookError::DuplicateOrderId(order.id));
        }
        if order.remaining.is_zero() {
            return Err(OrderBookError::ZeroQuantity { id: order.id });
        }

        let side = order.side;
        let price = order.offer;
        let id = order.id.clone();

        let ladder = self.ladder_mut(side);
        let handle = match ladder.search_mut(price) {
            Some(level) => level.insert_order(order),
            None => {
                let mut level = PriceLevel::new(price);
                let handle = level.insert_order(order);
                ladder.insert(level);
                handle
            }
        };

        self.index.insert(id, IndexEntry { side, price, handle });
        Ok(())
    }

    /// Cancels a resting order by id. Returns `false` if no such order is
    /// resting (already filled, already canceled, or never existed).
    pub fn cancel(&mut self, order_id: &str) -> Result<bool, OrderBookError> {
        let Some(entry) = self.index.get(order_id).copied() else {
            trace!(order_id, "cancel: no resting order with this id");
            return Ok(false);
        };

        let ladder = self.ladder_mut(entry.side);
        let level = ladder.search_mut(entry.price).ok_or_else(|| {
            error!(order_id, price = %entry.price, side = ?entry.side, "indexed order's price level is missing from its ladder");
            OrderBookError::InvariantViolation {
                order_id: order_id.to_string(),
            }
        })?;

        level.unlink(entry.handle);
        let now_empty = level.is_empty();
        if now_empty {
            ladder.delete(entry.price);
        }

        self.index.remove(order_id);
        trace!(order_id, "canceled resting order");
        Ok(true)
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.max()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.min()
    }

    /// Top `n` non-empty bid levels, best price first.
    pub fn top_bids(&self, n: usize) -> Vec<(Price, Quantity)> {
        self.bids.descending(n, level_if_non_empty)
    }

    /// Top `n` non-empty ask levels, best price first.
    pub fn top_asks(&self, n: usize) -> Vec<(Price, Quantity)> {
        self.asks.ascending(n, level_if_non_empty)
    }

    pub fn get_order(&self, order_id: &str) -> Option<&Order> {
        let entry = self.index.get(order_id)?;
        self.ladder(entry.side).search(entry.price)?.order(entry.handle)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Ids currently tracked by the id-index, in arbitrary order. Exposed
    /// for property tests that check book/index agreement (spec invariant
    /// 1): every indexed id must still resolve through `get_order`.
    pub fn indexed_ids(&self) -> Vec<OrderId> {
        self.index.keys().cloned().collect()
    }

    /// Whether the bid ladder's AVL balance invariant holds (spec
    /// invariant 4). Exposed for property tests.
    pub fn bids_balanced(&self) -> bool {
        self.bids.is_balanced()
    }

    /// Whether the ask ladder's AVL balance invariant holds.
    pub fn asks_balanced(&self) -> bool {
        self.asks.is_balanced()
    }

    /// The book's entry point for a submitted order: matches it against
    /// the opposing ladder and rests any eligible residual on this order's
    /// own side. Returns the order's final status and any trades emitted.
    ///
    /// `GoodTillCancel` orders never reach the matcher — per the resolved
    /// open question, they rest unconditionally, exactly as the source
    /// does (it wires no matching branch for them at all).
    pub fn match_order(&mut self, order: Order) -> Result<(OrderStatus, Trades), OrderBookError> {
        self.check_asset(&order)?;
        if order.remaining.is_zero() {
            return Err(OrderBookError::ZeroQuantity { id: order.id });
        }

        if order.order_type == OrderType::GoodTillCancel {
            let status = order.status;
            self.insert(order)?;
            return Ok((status, Vec::new()));
        }

        let mut order = order;
        let trades = matcher::dispatch(self, &mut order);
        let status = order.status;
        trace!(order_id = %order.id, ?status, trade_count = trades.len(), residual = %order.remaining, "matched order");

        if status == OrderStatus::Waiting && order.remaining > Quantity::ZERO {
            self.insert(order)?;
        }

        Ok((status, trades))
    }

    /// Price-crossing variant of limit matching: a buy limit at 105 sweeps
    /// asks at 100, 101, 102 up to 105, rather than matching only the
    /// level exactly at 105. Not the default (`match_order` preserves the
    /// source's strict price-match semantics) — opt in explicitly.
    pub fn match_order_crossing(&mut self, order: Order) -> Result<(OrderStatus, Trades), OrderBookError> {
        self.check_asset(&order)?;
        if order.remaining.is_zero() {
            return Err(OrderBookError::ZeroQuantity { id: order.id });
        }

        if order.order_type == OrderType::GoodTillCancel {
            let status = order.status;
            self.insert(order)?;
            return Ok((status, Vec::new()));
        }

        let mut order = order;
        let trades = matcher::dispatch_crossing(self, &mut order);
        let status = order.status;
        trace!(order_id = %order.id, ?status, trade_count = trades.len(), residual = %order.remaining, "matched order (crossing)");

        if status == OrderStatus::Waiting && order.remaining > Quantity::ZERO {
            self.insert(order)?;
        }

        Ok((status, trades))
    }
}

fn level_if_non_empty(level: &PriceLevel) -> Option<(Price, Quantity)> {
    let qty = level.total_quantity();
    (qty > Quantity::ZERO).then(|| (level.price(), qty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParticipantId;
    use rust_decimal_macros::dec;

    fn order(id: &str, side: Side, ty: OrderType, price: Price, qty: Quantity, asset: AssetId) -> Order {
        Order::new(id.to_string(), side, ty, price, asset, qty, ParticipantId::new())
    }

    #[test]
    fn insert_rejects_wrong_asset() {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);
        let o = order("1", Side::Buy, OrderType::Limit, dec!(100), dec!(1), AssetId::new());
        assert!(matches!(book.insert(o), Err(OrderBookError::AssetMismatch { .. })));
    }

    #[test]
    fn insert_rejects_zero_quantity() {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);
        let o = order("1", Side::Buy, OrderType::Limit, dec!(100), dec!(0), asset);
        assert!(matches!(book.insert(o), Err(OrderBookError::ZeroQuantity { .. })));
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);
        book.insert(order("1", Side::Buy, OrderType::Limit, dec!(100), dec!(1), asset))
            .unwrap();
        let dup = order("1", Side::Buy, OrderType::Limit, dec!(100), dec!(1), asset);
        assert!(matches!(book.insert(dup), Err(OrderBookError::DuplicateOrderId(_))));
    }

    #[test]
    fn cancel_removes_level_and_index_entry() {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);
        book.insert(order("1", Side::Sell, OrderType::Limit, dec!(100), dec!(5), asset))
            .unwrap();

        assert!(book.cancel("1").unwrap());
        assert!(book.best_ask().is_none());
        assert!(!book.cancel("1").unwrap());
    }

    #[test]
    fn indexed_ids_and_balance_reflect_book_state() {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);
        book.insert(order("1", Side::Buy, OrderType::Limit, dec!(99), dec!(10), asset))
            .unwrap();

        assert_eq!(book.indexed_ids(), vec!["1".to_string()]);
        assert!(book.bids_balanced());
        assert!(book.asks_balanced());

        book.cancel("1").unwrap();
        assert!(book.indexed_ids().is_empty());
    }

    #[test]
    fn get_top_bids_and_asks_report_non_zero_levels() {
        let asset = AssetId::new();
        let mut book = OrderBook::new(asset);
        book.insert(order("1", Side::Buy, OrderType::Limit, dec!(99), dec!(10), asset))
            .unwrap();
        book.insert(order("2", Side::Buy, OrderType::Limit, dec!(100), dec!(5), asset))
            .unwrap();
        book.insert(order("3", Side::Sell, OrderType::Limit, dec!(101), dec!(7), asset))
            .unwrap();

        assert_eq!(book.top_bids(5), vec![(dec!(100), dec!(5)), (dec!(99), dec!(10))]);
        assert_eq!(book.top_asks(5), vec![(dec!(101), dec!(7))]);
    }
}
