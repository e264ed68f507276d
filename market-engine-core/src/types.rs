use derive_more::Display;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Price and quantity are exact decimals throughout the matching path —
/// no binary floats, per the engine's decimal-arithmetic requirement.
pub type Price = Decimal;
pub type Quantity = Decimal;

/// Unique, caller-supplied identifier for an order.
pub type OrderId = String;

/// Opaque identifier for a trade, minted by the matcher on emission.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeId(pub Uuid);

impl TradeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque identifier for an asset.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssetId(pub Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque handle to the agent/participant that submitted an order.
///
/// The engine never dereferences this beyond equality; only the ledger,
/// which holds the real participant table, resolves it during settlement.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

/// A fungible asset traded on one order book.
///
/// `kind` is the classification tag a book checks orders against — two
/// assets with different `kind`s can never be matched against the same
/// book (an order's asset must match the book's own asset tag).
#[derive(Display, Debug, Clone, PartialEq)]
#[display("{}", kind)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Asset {
    pub id: AssetId,
    pub kind: String,
    pub last_price: Price,
    pub quantity_outstanding: Quantity,
}

impl Asset {
    pub fn new(kind: impl Into<String>, last_price: Price, quantity_outstanding: Quantity) -> Self {
        Self {
            id: AssetId::new(),
            kind: kind.into(),
            last_price,
            quantity_outstanding,
        }
    }
}

/// Which side of the book an order rests on or takes against.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[cfg_attr(feature = "cli", value(rename_all = "lower"))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an incoming order of this side matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type, governing how the matcher dispatches an incoming order.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[cfg_attr(feature = "cli", value(rename_all = "lower"))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderType {
    /// Sweeps the opposing ladder in price-priority order; never rests.
    Market,
    /// Matches only the opposing level at the exact offer price; residual rests.
    Limit,
    /// Rests unconditionally; never matched on submission.
    GoodTillCancel,
}

/// Lifecycle state of an order.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderStatus {
    Waiting,
    Filled,
    Canceled,
}

/// An order submitted to the engine.
///
/// Immutable except for `remaining` and `status`, which the matcher updates
/// in place as it fills against resting liquidity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    pub offer: Price,
    pub asset_id: AssetId,
    pub remaining: Quantity,
    pub submitter: ParticipantId,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(
        id: OrderId,
        side: Side,
        order_type: OrderType,
        offer: Price,
        asset_id: AssetId,
        quantity: Quantity,
        submitter: ParticipantId,
    ) -> Self {
        Self {
            id,
            side,
            order_type,
            offer,
            asset_id,
            remaining: quantity,
            submitter,
            status: OrderStatus::Waiting,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}

/// A completed, immutable trade record.
///
/// The executed price is always the maker's (resting order's) offer.
#[derive(Display, Debug, Clone, PartialEq)]
#[display("Trade: {} @ {} (buyer: {}, seller: {})", quantity, price, buyer, seller)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trade {
    pub id: TradeId,
    pub asset_id: AssetId,
    pub buyer: ParticipantId,
    pub seller: ParticipantId,
    pub quantity: Quantity,
    pub price: Price,
    pub amount_exchanged: Price,
}

impl Trade {
    pub fn new(
        asset_id: AssetId,
        buyer: ParticipantId,
        seller: ParticipantId,
        quantity: Quantity,
        price: Price,
    ) -> Self {
        Self {
            id: TradeId::new(),
            asset_id,
            buyer,
            seller,
            quantity,
            amount_exchanged: quantity * price,
            price,
        }
    }
}

/// A collection of trades, returned from a single match call.
pub type Trades = Vec<Trade>;

/// Errors raised by the order book / matcher layer.
///
/// `AssetMismatch`, `UnsupportedSide`, `DuplicateOrderId`, and
/// `ZeroQuantity` are recoverable preconditions: the caller gets a
/// `Result::Err` and no mutation happened. `InvariantViolation` is not —
/// it means the id-index and the ladders have disagreed, which can only
/// happen if the book's own bookkeeping is broken.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum OrderBookError {
    #[error("order asset {order_asset} does not match book asset {book_asset}")]
    AssetMismatch {
        order_asset: AssetId,
        book_asset: AssetId,
    },
    #[error("order side {0:?} is not supported for book routing")]
    UnsupportedSide(Side),
    #[error("order {0} already resting in book")]
    DuplicateOrderId(OrderId),
    #[error("order {id} has zero quantity")]
    ZeroQuantity { id: OrderId },
    #[error("invariant violation: order {order_id} is indexed but its price level is missing")]
    InvariantViolation { order_id: OrderId },
}
