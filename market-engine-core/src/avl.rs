//! A self-balancing binary search tree keyed by price, used as the bid and
//! ask ladders of an [`OrderBook`](crate::order_book::OrderBook).
//!
//! Height of an absent child is defined as −1, so a leaf has height 0. Every
//! insert and delete rebalances the full spine it touched, keeping every
//! node's balance factor in {−1, 0, +1}.

use crate::types::Price;
use std::cmp::Ordering;

/// A value stored in the ladder, keyed by its own price.
pub trait Keyed {
    fn key(&self) -> Price;
}

type Link<V> = Option<Box<Node<V>>>;

struct Node<V> {
    value: V,
    left: Link<V>,
    right: Link<V>,
    height: i32,
}

impl<V> Node<V> {
    fn leaf(value: V) -> Self {
        Node {
            value,
            left: None,
            right: None,
            height: 0,
        }
    }
}

fn height<V>(link: &Link<V>) -> i32 {
    link.as_ref().map_or(-1, |n| n.height)
}

fn update_height<V>(node: &mut Node<V>) {
    node.height = 1 + height(&node.left).max(height(&node.right));
}

fn balance_factor<V>(node: &Node<V>) -> i32 {
    height(&node.left) - height(&node.right)
}

fn rotate_left<V>(mut node: Box<Node<V>>) -> Box<Node<V>> {
    let mut right = node.right.take().expect("rotate_left requires a right child");
    node.right = right.left.take();
    update_height(&mut node);
    right.left = Some(node);
    update_height(&mut right);
    right
}

fn rotate_right<V>(mut node: Box<Node<V>>) -> Box<Node<V>> {
    let mut left = node.left.take().expect("rotate_right requires a left child");
    node.left = left.right.take();
    update_height(&mut node);
    left.right = Some(node);
    update_height(&mut left);
    left
}

/// Rebalances a node whose subtrees are each already balanced, restoring
/// the AVL invariant at this node after an insert/delete beneath it.
fn rebalance<V>(mut node: Box<Node<V>>) -> Box<Node<V>> {
    update_height(&mut node);
    let bf = balance_factor(&node);

    if bf > 1 {
        if balance_factor(node.left.as_ref().expect("bf > 1 implies a left child")) < 0 {
            let left = node.left.take().unwrap();
            node.left = Some(rotate_left(left));
        }
        return rotate_right(node);
    }

    if bf < -1 {
        if balance_factor(node.right.as_ref().expect("bf < -1 implies a right child")) > 0 {
            let right = node.right.take().unwrap();
            node.right = Some(rotate_right(right));
        }
        return rotate_left(node);
    }

    node
}

fn insert_rec<V: Keyed>(link: Link<V>, value: V) -> Link<V> {
    let mut node = match link {
        None => return Some(Box::new(Node::leaf(value))),
        Some(n) => n,
    };

    if value.key() <= node.value.key() {
        node.left = insert_rec(node.left.take(), value);
    } else {
        node.right = insert_rec(node.right.take(), value);
    }

    Some(rebalance(node))
}

/// Removes and returns the maximum-keyed value from the subtree, used by
/// delete to find the true in-order predecessor of a two-child node.
fn remove_max<V>(link: Link<V>) -> (Link<V>, Option<V>) {
    let mut node = match link {
        None => return (None, None),
        Some(n) => n,
    };

    if node.right.is_none() {
        return (node.left.take(), Some(node.value));
    }

    let (new_right, removed) = remove_max(node.right.take());
    node.right = new_right;
    (Some(rebalance(node)), removed)
}

fn delete_rec<V: Keyed>(link: Link<V>, key: Price) -> (Link<V>, Option<V>) {
    let mut node = match link {
        None => return (None, None),
        Some(n) => n,
    };

    match key.cmp(&node.value.key()) {
        Ordering::Less => {
            let (new_left, removed) = delete_rec(node.left.take(), key);
            node.left = new_left;
            (Some(rebalance(node)), removed)
        }
        Ordering::Greater => {
            let (new_right, removed) = delete_rec(node.right.take(), key);
            node.right = new_right;
            (Some(rebalance(node)), removed)
        }
        Ordering::Equal => match (node.left.take(), node.right.take()) {
            (None, None) => (None, Some(node.value)),
            (Some(l), None) => (Some(l), Some(node.value)),
            (None, Some(r)) => (Some(r), Some(node.value)),
            (Some(l), Some(r)) => {
                // True in-order predecessor: the rightmost node of the left
                // subtree, found by unconditionally descending right. This
                // is the fix for the source's `_greatest_child`, which
                // stopped early on some left-then-right shapes.
                let (new_left, predecessor) = remove_max(Some(l));
                let mut replacement = Box::new(Node::leaf(predecessor.expect("non-empty left subtree has a max")));
                replacement.left = new_left;
                replacement.right = Some(r);
                (Some(rebalance(replacement)), Some(node.value))
            }
        },
    }
}

fn search_rec<V: Keyed>(link: &Link<V>, key: Price) -> Option<&V> {
    let node = link.as_ref()?;
    match key.cmp(&node.value.key()) {
        Ordering::Equal => Some(&node.value),
        Ordering::Less => search_rec(&node.left, key),
        Ordering::Greater => search_rec(&node.right, key),
    }
}

fn search_mut_rec<V: Keyed>(link: &mut Link<V>, key: Price) -> Option<&mut V> {
    let node = link.as_mut()?;
    match key.cmp(&node.value.key()) {
        Ordering::Equal => Some(&mut node.value),
        Ordering::Less => search_mut_rec(&mut node.left, key),
        Ordering::Greater => search_mut_rec(&mut node.right, key),
    }
}

fn collect_ordered<'a, V: Keyed, T>(
    link: &'a Link<V>,
    descending: bool,
    limit: usize,
    out: &mut Vec<T>,
    project: &impl Fn(&'a V) -> Option<T>,
) {
    if out.len() >= limit {
        return;
    }
    let Some(node) = link else { return };

    let (near, far) = if descending {
        (&node.right, &node.left)
    } else {
        (&node.left, &node.right)
    };

    collect_ordered(near, descending, limit, out, project);
    if out.len() < limit {
        if let Some(item) = project(&node.value) {
            out.push(item);
        }
    }
    if out.len() < limit {
        collect_ordered(far, descending, limit, out, project);
    }
}

fn checked_height<V>(link: &Link<V>) -> Option<i32> {
    let node = link.as_ref()?;
    // A missing child is fine (height -1); a present child must itself
    // pass the check, so bubble None up on any violation below.
    let lh = match &node.left {
        None => -1,
        Some(_) => checked_height(&node.left)?,
    };
    let rh = match &node.right {
        None => -1,
        Some(_) => checked_height(&node.right)?,
    };
    if (lh - rh).abs() > 1 {
        return None;
    }
    let expected = 1 + lh.max(rh);
    if expected != node.height {
        return None;
    }
    Some(node.height)
}

/// A balanced price ladder: a BST keyed by `V::key()`, used for one side
/// (bid or ask) of an order book.
pub struct AvlTree<V> {
    root: Link<V>,
}

impl<V> Default for AvlTree<V> {
    fn default() -> Self {
        Self { root: None }
    }
}

impl<V: Keyed> AvlTree<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Inserts a value at its own price key. Callers must ensure no
    /// existing node shares that key (the order book mediates this via
    /// `search` before constructing a new price level).
    pub fn insert(&mut self, value: V) {
        self.root = insert_rec(self.root.take(), value);
    }

    /// Removes the unique node with this price key, if any.
    pub fn delete(&mut self, key: Price) -> Option<V> {
        let (root, removed) = delete_rec(self.root.take(), key);
        self.root = root;
        removed
    }

    pub fn search(&self, key: Price) -> Option<&V> {
        search_rec(&self.root, key)
    }

    pub fn search_mut(&mut self, key: Price) -> Option<&mut V> {
        search_mut_rec(&mut self.root, key)
    }

    /// Leftmost node — lowest price.
    pub fn min(&self) -> Option<&V> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some(&node.value)
    }

    /// Rightmost node — highest price.
    pub fn max(&self) -> Option<&V> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some(&node.value)
    }

    /// Collects up to `limit` values in ascending price order.
    pub fn ascending<T>(&self, limit: usize, project: impl Fn(&V) -> Option<T>) -> Vec<T> {
        let mut out = Vec::new();
        collect_ordered(&self.root, false, limit, &mut out, &project);
        out
    }

    /// Collects up to `limit` values in descending price order.
    pub fn descending<T>(&self, limit: usize, project: impl Fn(&V) -> Option<T>) -> Vec<T> {
        let mut out = Vec::new();
        collect_ordered(&self.root, true, limit, &mut out, &project);
        out
    }

    /// Verifies the AVL balance invariant over the whole tree: every node's
    /// balance factor is in {−1, 0, +1} and heights are internally
    /// consistent. Used by property tests (spec invariant: AVL balance).
    pub fn is_balanced(&self) -> bool {
        checked_height(&self.root).is_some()
    }
}
