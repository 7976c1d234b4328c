use std::collections::BTreeMap;

use crate::level::{PriceLevel, VolumeMismatch};
use crate::order::Order;
use crate::types::{LevelView, PriceTicks, Side, SizeLots};

/// One side of the book: price levels kept sorted at all times.
///
/// The BTreeMap maintains ascending key order, so the best price is the first
/// key for asks and the last key for bids; match-order iteration walks
/// outward from there. Levels are never re-sorted on read.
#[derive(Debug)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<PriceTicks, PriceLevel>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn best_price(&self) -> Option<PriceTicks> {
        match self.side {
            Side::Bid => self.levels.keys().next_back().copied(),
            Side::Ask => self.levels.keys().next().copied(),
        }
    }

    pub fn best_level(&self) -> Option<&PriceLevel> {
        match self.side {
            Side::Bid => self.levels.values().next_back(),
            Side::Ask => self.levels.values().next(),
        }
    }

    pub fn level_at(&self, price: PriceTicks) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    pub fn level_at_mut(&mut self, price: PriceTicks) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    /// Appends an order at `price`, creating the level on first use.
    pub fn insert_order(&mut self, price: PriceTicks, order: Order) -> Result<(), VolumeMismatch> {
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .add(order)
    }

    /// Tears down a level. Only empty levels may be removed.
    pub fn remove_level(&mut self, price: PriceTicks) -> Option<PriceLevel> {
        debug_assert!(
            self.levels.get(&price).map_or(true, PriceLevel::is_empty),
            "removing a non-empty level"
        );
        self.levels.remove(&price)
    }

    /// Lazy best-first traversal: ascending for asks, descending for bids.
    pub fn iter_in_match_order(&self) -> impl Iterator<Item = &PriceLevel> + '_ {
        let iter: Box<dyn Iterator<Item = &PriceLevel> + '_> = match self.side {
            Side::Bid => Box::new(self.levels.values().rev()),
            Side::Ask => Box::new(self.levels.values()),
        };
        iter
    }

    pub fn total_volume(&self) -> SizeLots {
        self.levels.values().map(PriceLevel::total_volume).sum()
    }

    pub fn level_views(&self) -> Vec<LevelView> {
        self.iter_in_match_order()
            .map(|level| LevelView {
                price: level.price(),
                size: level.total_volume(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u64, side: Side, size: SizeLots) -> Order {
        Order::new(id, 1, side, size)
    }

    #[test]
    fn ask_side_best_is_lowest() {
        let mut asks = BookSide::new(Side::Ask);
        asks.insert_order(105, order(1, Side::Ask, 1)).unwrap();
        asks.insert_order(101, order(2, Side::Ask, 1)).unwrap();
        asks.insert_order(103, order(3, Side::Ask, 1)).unwrap();

        assert_eq!(asks.best_price(), Some(101));
        let prices: Vec<_> = asks.iter_in_match_order().map(|l| l.price()).collect();
        assert_eq!(prices, vec![101, 103, 105]);
    }

    #[test]
    fn bid_side_best_is_highest() {
        let mut bids = BookSide::new(Side::Bid);
        bids.insert_order(95, order(1, Side::Bid, 1)).unwrap();
        bids.insert_order(97, order(2, Side::Bid, 1)).unwrap();
        bids.insert_order(96, order(3, Side::Bid, 1)).unwrap();

        assert_eq!(bids.best_price(), Some(97));
        let prices: Vec<_> = bids.iter_in_match_order().map(|l| l.price()).collect();
        assert_eq!(prices, vec![97, 96, 95]);
    }

    #[test]
    fn insert_reuses_existing_level() {
        let mut bids = BookSide::new(Side::Bid);
        bids.insert_order(100, order(1, Side::Bid, 2)).unwrap();
        bids.insert_order(100, order(2, Side::Bid, 3)).unwrap();

        assert_eq!(bids.level_count(), 1);
        let level = bids.level_at(100).unwrap();
        assert_eq!(level.len(), 2);
        assert_eq!(level.total_volume(), 5);
        // Time priority: first in, first at the head.
        assert_eq!(level.front().unwrap().id, 1);
    }

    #[test]
    fn remove_level_drops_it_from_iteration() {
        let mut bids = BookSide::new(Side::Bid);
        bids.insert_order(100, order(1, Side::Bid, 2)).unwrap();
        bids.insert_order(99, order(2, Side::Bid, 2)).unwrap();

        bids.level_at_mut(100).unwrap().remove(1).unwrap().unwrap();
        bids.remove_level(100);

        assert_eq!(bids.best_price(), Some(99));
        assert_eq!(bids.level_count(), 1);
    }

    #[test]
    fn total_volume_sums_levels() {
        let mut asks = BookSide::new(Side::Ask);
        assert_eq!(asks.total_volume(), 0);
        asks.insert_order(101, order(1, Side::Ask, 4)).unwrap();
        asks.insert_order(102, order(2, Side::Ask, 6)).unwrap();
        assert_eq!(asks.total_volume(), 10);
    }

    #[test]
    fn level_views_follow_match_order() {
        let mut bids = BookSide::new(Side::Bid);
        bids.insert_order(95, order(1, Side::Bid, 2)).unwrap();
        bids.insert_order(97, order(2, Side::Bid, 1)).unwrap();

        let views = bids.level_views();
        assert_eq!(views.len(), 2);
        assert_eq!((views[0].price, views[0].size), (97, 1));
        assert_eq!((views[1].price, views[1].size), (95, 2));
    }
}
