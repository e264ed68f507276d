//! The ledger that sits above one or more [`OrderBook`]s: it holds
//! participants' cash and holdings, checks affordability before an order
//! reaches the matcher, and settles the trades that come back.

use crate::order_book::OrderBook;
use crate::types::{Asset, AssetId, Order, OrderBookError, OrderStatus, ParticipantId, Price, Quantity, Side, Trade};
use std::collections::HashMap;
use tracing::warn;

/// A trading participant's cash balance and asset holdings.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub cash: Price,
    pub holdings: HashMap<AssetId, Quantity>,
}

impl Participant {
    pub fn new(starting_cash: Price) -> Self {
        Self {
            id: ParticipantId::new(),
            cash: starting_cash,
            holdings: HashMap::new(),
        }
    }

    pub fn holding_of(&self, asset_id: AssetId) -> Quantity {
        self.holdings.get(&asset_id).copied().unwrap_or(Quantity::ZERO)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("asset {0} is not listed on this market")]
    UnknownAsset(AssetId),
    #[error("participant {0} is not registered with this market")]
    UnknownParticipant(ParticipantId),
    #[error("asset {0} is already listed")]
    DuplicateAsset(AssetId),
    #[error(transparent)]
    OrderBook(#[from] OrderBookError),
}

/// Tracks listed assets, their order books, registered participants, and
/// the append-only trade history, and settles matches into cash/holdings
/// movements.
pub struct Market {
    assets: HashMap<AssetId, Asset>,
    books: HashMap<AssetId, OrderBook>,
    participants: HashMap<ParticipantId, Participant>,
    history: Vec<Trade>,
}

impl Default for Market {
    fn default() -> Self {
        Self::new()
    }
}

impl Market {
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
            books: HashMap::new(),
            participants: HashMap::new(),
            history: Vec::new(),
        }
    }

    pub fn add_asset(&mut self, asset: Asset) -> Result<AssetId, MarketError> {
        let id = asset.id;
        if self.assets.contains_key(&id) {
            return Err(MarketError::DuplicateAsset(id));
        }
        self.books.insert(id, OrderBook::new(id));
        self.assets.insert(id, asset);
        Ok(id)
    }

    pub fn add_participant(&mut self, participant: Participant) -> ParticipantId {
        let id = participant.id;
        self.participants.insert(id, participant);
        id
    }

    pub fn asset(&self, asset_id: AssetId) -> Option<&Asset> {
        self.assets.get(&asset_id)
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.get_mut(&id)
    }

    pub fn order_book(&self, asset_id: AssetId) -> Option<&OrderBook> {
        self.books.get(&asset_id)
    }

    pub fn history(&self) -> &[Trade] {
        &self.history
    }

    pub fn cancel(&mut self, asset_id: AssetId, order_id: &str) -> Result<bool, MarketError> {
        let book = self.books.get_mut(&asset_id).ok_or(MarketError::UnknownAsset(asset_id))?;
        Ok(book.cancel(order_id)?)
    }

    /// Submits `order` on behalf of `submitter`. A buy is rejected before
    /// it ever reaches the matcher if the participant's cash can't cover
    /// the order's quantity priced at the asset's last trade price (the
    /// order's own limit/market price is not yet known to have executed,
    /// so the pre-check is conservative and uses the asset's last mark). A
    /// sell is rejected if the participant doesn't hold enough of the
    /// asset. Either rejection returns `Canceled` without mutating the
    /// book.
    pub fn submit(&mut self, asset_id: AssetId, submitter: ParticipantId, order: Order) -> Result<OrderStatus, MarketError> {
        let asset = self.assets.get(&asset_id).ok_or(MarketError::UnknownAsset(asset_id))?;
        let participant = self
            .participants
            .get(&submitter)
            .ok_or(MarketError::UnknownParticipant(submitter))?;

        match order.side {
            Side::Buy => {
                let required = asset.last_price * order.remaining;
                if required > participant.cash {
                    warn!(order_id = %order.id, %submitter, %required, cash = %participant.cash, "buy rejected: insufficient cash");
                    return Ok(OrderStatus::Canceled);
                }
            }
            Side::Sell => {
                if participant.holding_of(asset_id) < order.remaining {
                    warn!(order_id = %order.id, %submitter, "sell rejected: insufficient holdings");
                    return Ok(OrderStatus::Canceled);
                }
            }
        }

        let book = self.books.get_mut(&asset_id).ok_or(MarketError::UnknownAsset(asset_id))?;
        let (status, trades) = book.match_order(order)?;
        self.process_trades(&trades);
        Ok(status)
    }

    /// Settles each trade: cash and holdings move from seller to buyer,
    /// the asset's last price is marked to `amount_exchanged / quantity`
    /// (floored at zero), and the trade is appended to history.
    fn process_trades(&mut self, trades: &[Trade]) {
        for trade in trades {
            let amount = trade.amount_exchanged;

            if let Some(buyer) = self.participants.get_mut(&trade.buyer) {
                buyer.cash -= amount;
                *buyer.holdings.entry(trade.asset_id).or_insert(Quantity::ZERO) += trade.quantity;
            }

            if let Some(seller) = self.participants.get_mut(&trade.seller) {
                seller.cash += amount;
                let held = seller.holdings.entry(trade.asset_id).or_insert(Quantity::ZERO);
                *held -= trade.quantity;
                if held.is_zero() {
                    seller.holdings.remove(&trade.asset_id);
                }
            }

            if let Some(asset) = self.assets.get_mut(&trade.asset_id) {
                asset.last_price = (amount / trade.quantity).max(Price::ZERO);
            }

            self.history.push(trade.clone());
        }
    }
}
