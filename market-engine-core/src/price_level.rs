//! All resting orders at one price, FIFO-ordered by submission time.
//!
//! The queue is intrusive in spirit — `unlink` is O(1) given a handle — but
//! implemented as a small slab (`Vec<Slot>` plus a free list) rather than
//! raw prev/next pointers, since Rust has no safe equivalent of an
//! intrusive doubly-linked list without `unsafe`. A [`NodeHandle`] is the
//! non-owning reference the order book's id-index stores; it must not
//! outlive the slot it names.

use crate::avl::Keyed;
use crate::types::{Order, Price, Quantity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

struct Slot {
    order: Option<Order>,
    prev: Option<usize>,
    next: Option<usize>,
}

pub struct PriceLevel {
    price: Price,
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    total_quantity: Quantity,
}

impl Keyed for PriceLevel {
    fn key(&self) -> Price {
        self.price
    }
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            total_quantity: Quantity::ZERO,
        }
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Appends an order at the tail. O(1).
    pub fn insert_order(&mut self, order: Order) -> NodeHandle {
        self.total_quantity += order.remaining;

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Slot {
                    order: Some(order),
                    prev: self.tail,
                    next: None,
                };
                idx
            }
            None => {
                self.slots.push(Slot {
                    order: Some(order),
                    prev: self.tail,
                    next: None,
                });
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.slots[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        NodeHandle(idx)
    }

    /// Removes the order named by `handle` and reclaims its slot. O(1).
    pub fn unlink(&mut self, handle: NodeHandle) -> Option<Order> {
        let slot = self.slots.get_mut(handle.0)?;
        let order = slot.order.take()?;
        let (prev, next) = (slot.prev, slot.next);
        slot.prev = None;
        slot.next = None;

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }

        self.total_quantity -= order.remaining;
        self.free.push(handle.0);
        Some(order)
    }

    /// Handle of the oldest resting order, if any.
    pub fn front_handle(&self) -> Option<NodeHandle> {
        self.head.map(NodeHandle)
    }

    pub fn order(&self, handle: NodeHandle) -> Option<&Order> {
        self.slots.get(handle.0)?.order.as_ref()
    }

    pub fn order_mut(&mut self, handle: NodeHandle) -> Option<&mut Order> {
        self.slots.get_mut(handle.0)?.order.as_mut()
    }

    /// Reduces the total-quantity cache to reflect a partial fill of the
    /// order at `handle`, without unlinking it.
    pub fn shrink_by(&mut self, delta: Quantity) {
        self.total_quantity -= delta;
    }

    /// Orders in FIFO (submission) order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        let mut next = self.head;
        std::iter::from_fn(move || {
            let idx = next?;
            let slot = &self.slots[idx];
            next = slot.next;
            slot.order.as_ref()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetId, OrderType, ParticipantId, Side};
    use rust_decimal_macros::dec;

    fn mk_order(id: &str, qty: Quantity) -> Order {
        Order::new(
            id.to_string(),
            Side::Buy,
            OrderType::Limit,
            dec!(100),
            AssetId::new(),
            qty,
            ParticipantId::new(),
        )
    }

    #[test]
    fn fifo_order_preserved() {
        let mut level = PriceLevel::new(dec!(100));
        let h1 = level.insert_order(mk_order("1", dec!(3)));
        let h2 = level.insert_order(mk_order("2", dec!(2)));

        assert_eq!(level.total_quantity(), dec!(5));
        assert_eq!(level.front_handle(), Some(h1));
        let ids: Vec<_> = level.iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids, vec!["1".to_string(), "2".to_string()]);

        let removed = level.unlink(h1).unwrap();
        assert_eq!(removed.id, "1");
        assert_eq!(level.total_quantity(), dec!(2));
        assert_eq!(level.front_handle(), Some(h2));

        level.unlink(h2);
        assert!(level.is_empty());
        assert_eq!(level.total_quantity(), dec!(0));
    }

    #[test]
    fn unlinked_slot_is_reused() {
        let mut level = PriceLevel::new(dec!(100));
        let h1 = level.insert_order(mk_order("1", dec!(1)));
        level.unlink(h1);
        let h2 = level.insert_order(mk_order("2", dec!(1)));
        assert_eq!(h1, h2, "freed slot should be recycled");
        assert_eq!(level.iter().count(), 1);
    }

    #[test]
    fn shrink_by_updates_total_without_unlinking() {
        let mut level = PriceLevel::new(dec!(100));
        let h1 = level.insert_order(mk_order("1", dec!(10)));
        level.order_mut(h1).unwrap().remaining = dec!(4);
        level.shrink_by(dec!(6));
        assert_eq!(level.total_quantity(), dec!(4));
        assert!(!level.is_empty());
    }
}
