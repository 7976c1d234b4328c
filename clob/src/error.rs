use thiserror::Error;

use crate::types::{OrderId, PriceTicks, SizeLots};

/// Client-visible failures. Validation and precondition errors leave the book
/// untouched; `Poisoned` means the book detected an internal inconsistency
/// and refuses further operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown market: {0}")]
    UnknownMarket(String),

    #[error("invalid size: {0}")]
    InvalidSize(SizeLots),

    #[error("invalid price: {0}")]
    InvalidPrice(PriceTicks),

    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        requested: SizeLots,
        available: SizeLots,
    },

    #[error("order not found: {0}")]
    NotFound(OrderId),

    #[error("book is poisoned and no longer accepts operations")]
    Poisoned,
}
