use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::EngineError;
use crate::order::Order;
use crate::side::BookSide;
use crate::types::{
    timestamp_ns, BestQuote, BookView, Match, OrderId, PriceTicks, Side, SizeLots, Trade, UserId,
};

/// Where a resting order lives. Only meaningful while the book lock is held;
/// this is the non-owning back-reference from an order to its price level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OrderLocator {
    pub side: Side,
    pub price: PriceTicks,
    pub user_id: UserId,
}

/// The system of record for one instrument: both sides, an id index for O(1)
/// cancellation, and the append-only trade log that settlement replays.
///
/// A placement is atomic with respect to the `&mut self` borrow; callers that
/// share a book across threads wrap it in a lock and hold it for the whole
/// operation.
#[derive(Debug)]
pub struct Book {
    bids: BookSide,
    asks: BookSide,
    orders: HashMap<OrderId, OrderLocator>,
    trades: Vec<Trade>,
    poisoned: bool,
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}

impl Book {
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(Side::Bid),
            asks: BookSide::new(Side::Ask),
            orders: HashMap::new(),
            trades: Vec::new(),
            poisoned: false,
        }
    }

    /// Places a limit order. A marketable limit first consumes the opposing
    /// side at each crossed level's price; any remainder rests at `price`.
    /// Fully filled orders never enter the index.
    pub fn place_limit(
        &mut self,
        id: OrderId,
        user_id: UserId,
        side: Side,
        price: PriceTicks,
        size: SizeLots,
    ) -> Result<Vec<Match>, EngineError> {
        self.ensure_live()?;
        if size == 0 {
            return Err(EngineError::InvalidSize(size));
        }
        if price == 0 {
            return Err(EngineError::InvalidPrice(price));
        }

        let mut taker = Order::new(id, user_id, side, size);
        let matches = self.match_against_opposing(&mut taker, Some(price))?;

        if !taker.is_filled() {
            if self.side_mut(side).insert_order(price, taker).is_err() {
                self.poisoned = true;
                return Err(EngineError::Poisoned);
            }
            self.orders.insert(
                taker.id,
                OrderLocator {
                    side,
                    price,
                    user_id,
                },
            );
            info!(
                order_id = taker.id,
                user_id,
                %side,
                price,
                size = taker.remaining,
                "new resting limit order"
            );
        }

        self.record_trades(side, &matches);
        self.debug_validate();
        Ok(matches)
    }

    /// Places a market order against the opposing side. If the side holds
    /// less volume than requested the order fails with no state change;
    /// market orders never rest.
    pub fn place_market(
        &mut self,
        id: OrderId,
        user_id: UserId,
        side: Side,
        size: SizeLots,
    ) -> Result<Vec<Match>, EngineError> {
        self.ensure_live()?;
        if size == 0 {
            return Err(EngineError::InvalidSize(size));
        }

        let available = self.opposing(side).total_volume();
        if size > available {
            return Err(EngineError::InsufficientLiquidity {
                requested: size,
                available,
            });
        }

        let mut taker = Order::new(id, user_id, side, size);
        let matches = self.match_against_opposing(&mut taker, None)?;
        debug_assert!(taker.is_filled(), "market order left unfilled after pre-check");

        info!(
            order_id = id,
            user_id,
            %side,
            size,
            fills = matches.len(),
            "market order filled"
        );

        self.record_trades(side, &matches);
        self.debug_validate();
        Ok(matches)
    }

    /// Removes a resting order, tearing down its level if it was the last
    /// one there. Returns the removed order.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<Order, EngineError> {
        self.ensure_live()?;
        let locator = self
            .orders
            .remove(&order_id)
            .ok_or(EngineError::NotFound(order_id))?;

        let side = match locator.side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        let Some(level) = side.level_at_mut(locator.price) else {
            // The index pointed at a level that no longer exists.
            self.poisoned = true;
            return Err(EngineError::Poisoned);
        };
        let Ok(Some(order)) = level.remove(order_id) else {
            self.poisoned = true;
            return Err(EngineError::Poisoned);
        };
        if level.is_empty() {
            side.remove_level(locator.price);
            debug!(price = locator.price, side = %locator.side, "cleared empty price level");
        }

        info!(order_id, user_id = order.user_id, "order cancelled");
        self.debug_validate();
        Ok(order)
    }

    /// Read-only projection: levels in match order plus side totals.
    pub fn snapshot(&self) -> BookView {
        BookView {
            bids: self.bids.level_views(),
            asks: self.asks.level_views(),
            total_bid_volume: self.bids.total_volume(),
            total_ask_volume: self.asks.total_volume(),
        }
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn best_bid(&self) -> Option<BestQuote> {
        Self::best_quote(&self.bids)
    }

    pub fn best_ask(&self) -> Option<BestQuote> {
        Self::best_quote(&self.asks)
    }

    pub fn has_order(&self, order_id: OrderId) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Resolves a resting order to its location and current state.
    pub fn resting_order(&self, order_id: OrderId) -> Option<(OrderLocator, Order)> {
        let locator = *self.orders.get(&order_id)?;
        let level = self.side(locator.side).level_at(locator.price)?;
        let order = *level.get(order_id)?;
        Some((locator, order))
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Full consistency walk over both sides and the id index. Cheap enough
    /// for tests and debug builds; not run on the hot path in release.
    pub fn validate(&self) -> Result<(), String> {
        let mut resting = 0usize;
        for side in [&self.bids, &self.asks] {
            for level in side.iter_in_match_order() {
                if level.is_empty() {
                    return Err(format!("empty level resting at price {}", level.price()));
                }
                let mut sum: SizeLots = 0;
                for order in level.orders() {
                    if order.is_filled() {
                        return Err(format!(
                            "filled order {} resting at price {}",
                            order.id,
                            level.price()
                        ));
                    }
                    if order.side != side.side() {
                        return Err(format!("order {} resting on the wrong side", order.id));
                    }
                    match self.orders.get(&order.id) {
                        Some(loc) if loc.side == order.side && loc.price == level.price() => {}
                        _ => return Err(format!("order {} missing from index", order.id)),
                    }
                    sum += order.remaining;
                    resting += 1;
                }
                if sum != level.total_volume() {
                    return Err(format!(
                        "level {} volume cache {} != order sum {}",
                        level.price(),
                        level.total_volume(),
                        sum
                    ));
                }
            }
        }
        if resting != self.orders.len() {
            return Err(format!(
                "index holds {} entries but {} orders are resting",
                self.orders.len(),
                resting
            ));
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.poisoned {
            Err(EngineError::Poisoned)
        } else {
            Ok(())
        }
    }

    fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn opposing(&self, side: Side) -> &BookSide {
        self.side(side.opposite())
    }

    /// Core matching loop: walk the opposing side best-first, filling level
    /// by level until the taker is done, the side is exhausted, or the next
    /// level no longer satisfies the taker's limit. A volume mismatch inside
    /// a level poisons the book.
    fn match_against_opposing(
        &mut self,
        taker: &mut Order,
        limit: Option<PriceTicks>,
    ) -> Result<Vec<Match>, EngineError> {
        let mut matches = Vec::new();

        while !taker.is_filled() {
            let opposing = match taker.side {
                Side::Bid => &mut self.asks,
                Side::Ask => &mut self.bids,
            };
            let Some(best) = opposing.best_price() else {
                break;
            };
            if let Some(limit_price) = limit {
                let crosses = match taker.side {
                    Side::Bid => best <= limit_price,
                    Side::Ask => best >= limit_price,
                };
                if !crosses {
                    break;
                }
            }
            let Some(level) = opposing.level_at_mut(best) else {
                break;
            };

            let level_matches = match level.fill(taker) {
                Ok(level_matches) => level_matches,
                Err(_) => {
                    self.poisoned = true;
                    return Err(EngineError::Poisoned);
                }
            };

            // Makers consumed in full are gone from the level; drop their
            // index entries. A partially filled head keeps its entry.
            for m in &level_matches {
                let maker_id = match taker.side {
                    Side::Bid => m.ask_order_id,
                    Side::Ask => m.bid_order_id,
                };
                if level.get(maker_id).is_none() {
                    self.orders.remove(&maker_id);
                }
            }

            let exhausted = level.is_empty();
            if exhausted {
                opposing.remove_level(best);
                debug!(price = best, side = %taker.side.opposite(), "cleared empty price level");
            }
            matches.extend(level_matches);
        }

        Ok(matches)
    }

    fn record_trades(&mut self, taker_side: Side, matches: &[Match]) {
        let ts = timestamp_ns();
        for m in matches {
            self.trades.push(Trade {
                price: m.price,
                size: m.size_filled,
                timestamp: ts,
                taker_side,
            });
        }
    }

    fn best_quote(side: &BookSide) -> Option<BestQuote> {
        let level = side.best_level()?;
        let head = level.front()?;
        Some(BestQuote {
            price: level.price(),
            user_id: head.user_id,
        })
    }

    fn debug_validate(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = self.validate() {
                panic!("book invariant violated: {violation}");
            }
        }
    }
}
