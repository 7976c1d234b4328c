//! Continuous double-auction limit order book matching engine.
//!
//! Price-time priority matching for limit and market orders over any number
//! of registered markets, with O(1) cancellation, exact aggregate-volume
//! accounting on scaled integers, and an asynchronous settlement handoff
//! that never blocks the matching path.

pub mod book;
pub mod engine;
pub mod error;
pub mod level;
pub mod order;
pub mod settlement;
pub mod side;
pub mod types;

pub use book::Book;
pub use engine::Engine;
pub use error::EngineError;
pub use settlement::{spawn_settlement_worker, NoopSettler, Settler};
pub use types::{
    BestQuote, BookView, LevelView, Match, OrderId, PriceTicks, Settlement, SettlementBatch, Side,
    SizeLots, Trade, UserId, UserOrder, UserOrders,
};
