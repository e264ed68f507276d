//! # Market Engine Core
//!
//! A discrete-event limit order book matching engine with price-time
//! priority, backed by an AVL-balanced price ladder, plus a settlement
//! ledger that tracks participants' cash and holdings across trades.
//!
//! ## Example
//!
//! ```rust
//! use market_engine_core::{Market, Participant, OrderType};
//! use market_engine_core::types::{Asset, Order, Side};
//! use rust_decimal_macros::dec;
//!
//! let mut market = Market::new();
//! let asset_id = market.add_asset(Asset::new("BTC", dec!(100), dec!(0))).unwrap();
//! let mut seller_account = Participant::new(dec!(0));
//! seller_account.holdings.insert(asset_id, dec!(10));
//! let seller = market.add_participant(seller_account);
//! let buyer = market.add_participant(Participant::new(dec!(10_000)));
//!
//! market
//!     .submit(asset_id, seller, Order::new(
//!         "ask-1".into(), Side::Sell, OrderType::Limit, dec!(100), asset_id, dec!(10),
//!         seller,
//!     ))
//!     .unwrap();
//!
//! let status = market
//!     .submit(asset_id, buyer, Order::new(
//!         "bid-1".into(), Side::Buy, OrderType::Limit, dec!(100), asset_id, dec!(10),
//!         buyer,
//!     ))
//!     .unwrap();
//!
//! assert_eq!(market.history().len(), 1);
//! ```

pub mod avl;
pub mod market;
pub mod matcher;
pub mod order_book;
pub mod price_level;
pub mod types;

pub use market::{Market, MarketError, Participant};
pub use order_book::OrderBook;
pub use types::{Order, OrderBookError, OrderStatus, OrderType, Side, Trade, Trades};
