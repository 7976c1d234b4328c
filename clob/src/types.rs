use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub type OrderId = u64;
pub type UserId = u64;
/// Price in integer ticks. Strictly positive for every resting level.
pub type PriceTicks = u64;
/// Size in integer lots.
pub type SizeLots = u64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// Durable record of one execution, appended to the book's trade log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub price: PriceTicks,
    pub size: SizeLots,
    pub timestamp: u64,
    pub taker_side: Side,
}

/// Pairing produced when a taker consumes maker liquidity. Carries both
/// counterparties so settlement events can be built without another book
/// lookup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub bid_order_id: OrderId,
    pub ask_order_id: OrderId,
    pub bid_user_id: UserId,
    pub ask_user_id: UserId,
    pub size_filled: SizeLots,
    pub price: PriceTicks,
}

impl Match {
    /// The resting counterparty: the ask user when a bid takes, and vice versa.
    pub fn maker_user_id(&self, taker_side: Side) -> UserId {
        match taker_side {
            Side::Bid => self.ask_user_id,
            Side::Ask => self.bid_user_id,
        }
    }

    pub fn taker_user_id(&self, taker_side: Side) -> UserId {
        match taker_side {
            Side::Bid => self.bid_user_id,
            Side::Ask => self.ask_user_id,
        }
    }
}

/// What the settlement collaborator receives for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub maker_user_id: UserId,
    pub taker_user_id: UserId,
    pub size: SizeLots,
    pub price: PriceTicks,
    pub market: String,
}

/// All settlements from a single placement, handed off as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub market: String,
    pub taker_side: Side,
    pub settlements: Vec<Settlement>,
    pub ts: u64,
}

/// One aggregated price level as seen by external readers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelView {
    pub price: PriceTicks,
    pub size: SizeLots,
}

/// Read-only projection of a book: levels in match order plus side totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    pub bids: Vec<LevelView>,
    pub asks: Vec<LevelView>,
    pub total_bid_volume: SizeLots,
    pub total_ask_volume: SizeLots,
}

/// Head of the best level on one side: its price and the resting user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestQuote {
    pub price: PriceTicks,
    pub user_id: UserId,
}

/// A resting order as reported by user-side queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOrder {
    pub market: String,
    pub order_id: OrderId,
    pub side: Side,
    pub price: PriceTicks,
    pub size: SizeLots,
    pub created_at: u64,
}

/// Resting bids and asks belonging to one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOrders {
    pub bids: Vec<UserOrder>,
    pub asks: Vec<UserOrder>,
}

pub(crate) fn timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
    }

    #[test]
    fn match_counterparty_resolution() {
        let m = Match {
            bid_order_id: 1,
            ask_order_id: 2,
            bid_user_id: 10,
            ask_user_id: 20,
            size_filled: 5,
            price: 100,
        };

        // A bid taker was filled by a resting ask.
        assert_eq!(m.maker_user_id(Side::Bid), 20);
        assert_eq!(m.taker_user_id(Side::Bid), 10);

        // An ask taker was filled by a resting bid.
        assert_eq!(m.maker_user_id(Side::Ask), 10);
        assert_eq!(m.taker_user_id(Side::Ask), 20);
    }
}
