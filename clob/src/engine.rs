use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use tokio::sync::mpsc;
use tracing::warn;

use crate::book::Book;
use crate::error::EngineError;
use crate::types::{
    timestamp_ns, BestQuote, BookView, Match, OrderId, PriceTicks, Settlement, SettlementBatch,
    Side, SizeLots, Trade, UserId, UserOrder, UserOrders,
};

/// Facade over one book per registered market.
///
/// Each book is its own critical section: placements and cancels take the
/// book's write lock for the whole operation, views take the read lock.
/// Markets are fixed at construction, so the map itself is never locked.
/// Order ids come from a single process-wide counter drawn inside the book's
/// critical section, keeping per-level queues id-sorted; every placement
/// that matched hands its batch to the settlement channel without blocking.
pub struct Engine {
    books: HashMap<String, RwLock<Book>>,
    next_order_id: AtomicU64,
    user_orders: Mutex<HashMap<UserId, Vec<(String, OrderId)>>>,
    settlements: mpsc::UnboundedSender<SettlementBatch>,
}

impl Engine {
    /// Registers one book per market symbol and returns the engine together
    /// with the stream of settlement batches for the collaborator to consume.
    pub fn new<I, S>(markets: I) -> (Self, mpsc::UnboundedReceiver<SettlementBatch>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let books = markets
            .into_iter()
            .map(|market| (market.into(), RwLock::new(Book::new())))
            .collect();
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self {
            books,
            next_order_id: AtomicU64::new(1),
            user_orders: Mutex::new(HashMap::new()),
            settlements: tx,
        };
        (engine, rx)
    }

    pub fn markets(&self) -> Vec<String> {
        let mut markets: Vec<_> = self.books.keys().cloned().collect();
        markets.sort();
        markets
    }

    /// Places a limit order and returns its assigned id. The id is valid
    /// whether the order rested, partially filled, or filled in full.
    pub fn place_limit(
        &self,
        market: &str,
        user_id: UserId,
        side: Side,
        price: PriceTicks,
        size: SizeLots,
    ) -> Result<OrderId, EngineError> {
        if size == 0 {
            return Err(EngineError::InvalidSize(size));
        }
        if price == 0 {
            return Err(EngineError::InvalidPrice(price));
        }
        let book = self.book(market)?;

        let (order_id, matches, rested) = {
            let mut book = book.write().map_err(|_| EngineError::Poisoned)?;
            // Drawn under the book lock: level queues are binary-searched by
            // id, so id order and insertion order must agree.
            let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
            let matches = book.place_limit(order_id, user_id, side, price, size)?;
            let rested = book.has_order(order_id);
            (order_id, matches, rested)
        };

        if rested {
            let mut user_orders = self.user_orders.lock().unwrap_or_else(|e| e.into_inner());
            user_orders
                .entry(user_id)
                .or_default()
                .push((market.to_string(), order_id));
        }

        self.dispatch_settlements(market, side, &matches);
        Ok(order_id)
    }

    /// Places a market order, returning its id and the matches it produced.
    /// All-or-nothing: insufficient opposing volume rejects the order with
    /// no state change.
    pub fn place_market(
        &self,
        market: &str,
        user_id: UserId,
        side: Side,
        size: SizeLots,
    ) -> Result<(OrderId, Vec<Match>), EngineError> {
        if size == 0 {
            return Err(EngineError::InvalidSize(size));
        }
        let book = self.book(market)?;

        let (order_id, matches) = {
            let mut book = book.write().map_err(|_| EngineError::Poisoned)?;
            // Drawn under the book lock; see place_limit.
            let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
            let matches = book.place_market(order_id, user_id, side, size)?;
            (order_id, matches)
        };

        self.dispatch_settlements(market, side, &matches);
        Ok((order_id, matches))
    }

    /// Cancels a resting order wherever it lives. A cancel racing a match is
    /// resolved by the book lock: once matching consumed the order, the id
    /// no longer resolves and the cancel reports `NotFound`.
    pub fn cancel(&self, order_id: OrderId) -> Result<(), EngineError> {
        for (market, book) in &self.books {
            let cancelled = {
                let Ok(mut book) = book.write() else {
                    continue;
                };
                match book.cancel(order_id) {
                    Ok(order) => Some(order),
                    Err(EngineError::NotFound(_)) => None,
                    Err(err) => {
                        warn!(market = %market, order_id, %err, "cancel skipped unhealthy book");
                        None
                    }
                }
            };
            if let Some(order) = cancelled {
                let mut user_orders = self.user_orders.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(entries) = user_orders.get_mut(&order.user_id) {
                    entries.retain(|(_, id)| *id != order_id);
                }
                return Ok(());
            }
        }
        Err(EngineError::NotFound(order_id))
    }

    pub fn book_view(&self, market: &str) -> Result<BookView, EngineError> {
        let book = self.read_book(market)?;
        Ok(book.snapshot())
    }

    pub fn trades(&self, market: &str) -> Result<Vec<Trade>, EngineError> {
        let book = self.read_book(market)?;
        Ok(book.trades().to_vec())
    }

    pub fn best_bid(&self, market: &str) -> Result<Option<BestQuote>, EngineError> {
        let book = self.read_book(market)?;
        Ok(book.best_bid())
    }

    pub fn best_ask(&self, market: &str) -> Result<Option<BestQuote>, EngineError> {
        let book = self.read_book(market)?;
        Ok(book.best_ask())
    }

    /// Resting orders for one user, grouped by side. Entries whose orders
    /// have since filled or cancelled are pruned as they are encountered.
    pub fn user_orders(&self, user_id: UserId) -> UserOrders {
        let mut result = UserOrders::default();
        let mut user_orders = self.user_orders.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = user_orders.get_mut(&user_id) else {
            return result;
        };

        entries.retain(|(market, order_id)| {
            let Some(book) = self.books.get(market) else {
                return false;
            };
            let Ok(book) = book.read() else {
                return false;
            };
            let Some((locator, order)) = book.resting_order(*order_id) else {
                return false;
            };
            let user_order = UserOrder {
                market: market.clone(),
                order_id: *order_id,
                side: locator.side,
                price: locator.price,
                size: order.remaining,
                created_at: order.created_at,
            };
            match locator.side {
                Side::Bid => result.bids.push(user_order),
                Side::Ask => result.asks.push(user_order),
            }
            true
        });

        result
    }

    fn book(&self, market: &str) -> Result<&RwLock<Book>, EngineError> {
        self.books
            .get(market)
            .ok_or_else(|| EngineError::UnknownMarket(market.to_string()))
    }

    fn read_book(&self, market: &str) -> Result<std::sync::RwLockReadGuard<'_, Book>, EngineError> {
        self.book(market)?.read().map_err(|_| EngineError::Poisoned)
    }

    /// Hands the match batch to the settlement collaborator. The send never
    /// blocks the matching path; a missing consumer is logged, not fatal.
    fn dispatch_settlements(&self, market: &str, taker_side: Side, matches: &[Match]) {
        if matches.is_empty() {
            return;
        }
        let settlements = matches
            .iter()
            .map(|m| Settlement {
                maker_user_id: m.maker_user_id(taker_side),
                taker_user_id: m.taker_user_id(taker_side),
                size: m.size_filled,
                price: m.price,
                market: market.to_string(),
            })
            .collect();
        let batch = SettlementBatch {
            market: market.to_string(),
            taker_side,
            settlements,
            ts: timestamp_ns(),
        };
        if self.settlements.send(batch).is_err() {
            warn!(market, "settlement receiver dropped; match batch not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn engine() -> (Engine, mpsc::UnboundedReceiver<SettlementBatch>) {
        Engine::new(["ETH"])
    }

    #[test]
    fn unknown_market_is_rejected() {
        let (engine, _rx) = engine();
        assert_eq!(
            engine.place_limit("DOGE", 1, Side::Bid, 100, 5).unwrap_err(),
            EngineError::UnknownMarket("DOGE".to_string())
        );
        assert_eq!(
            engine.book_view("DOGE").unwrap_err(),
            EngineError::UnknownMarket("DOGE".to_string())
        );
    }

    #[test]
    fn placement_is_visible_once_the_call_returns() {
        let (engine, _rx) = engine();
        let order_id = engine.place_limit("ETH", 1, Side::Bid, 100, 5).unwrap();

        let view = engine.book_view("ETH").unwrap();
        assert_eq!(view.bids.len(), 1);
        assert_eq!(view.total_bid_volume, 5);

        engine.cancel(order_id).unwrap();
        assert!(engine.book_view("ETH").unwrap().bids.is_empty());
        assert_eq!(
            engine.cancel(order_id).unwrap_err(),
            EngineError::NotFound(order_id)
        );
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let (engine, _rx) = engine();
        let engine = Arc::new(engine);

        let mut handles = Vec::new();
        for t in 0..8u64 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                let mut ids = Vec::new();
                for i in 0..200u64 {
                    let price = 1 + (t * 200 + i) % 50;
                    let id = engine.place_limit("ETH", t, Side::Bid, price, 1).unwrap();
                    ids.push(id);
                }
                ids
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate order id {id}");
            }
        }
        assert_eq!(seen.len(), 1600);
    }

    #[test]
    fn concurrent_placements_keep_the_book_consistent() {
        let (engine, _rx) = engine();
        let engine = Arc::new(engine);

        let mut handles = Vec::new();
        for t in 0..4u64 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for i in 0..100u64 {
                    let side = if (t + i) % 2 == 0 { Side::Bid } else { Side::Ask };
                    let price = 90 + (i % 21);
                    engine.place_limit("ETH", t, side, price, 2).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let view = engine.book_view("ETH").unwrap();
        let bid_sum: SizeLots = view.bids.iter().map(|l| l.size).sum();
        let ask_sum: SizeLots = view.asks.iter().map(|l| l.size).sum();
        assert_eq!(bid_sum, view.total_bid_volume);
        assert_eq!(ask_sum, view.total_ask_volume);
        // A crossed book cannot survive serialized placements.
        if let (Some(bid), Some(ask)) = (
            engine.best_bid("ETH").unwrap(),
            engine.best_ask("ETH").unwrap(),
        ) {
            assert!(bid.price < ask.price);
        }
    }

    #[tokio::test]
    async fn matches_are_dispatched_to_settlement() {
        let (engine, mut rx) = engine();
        engine.place_limit("ETH", 1, Side::Ask, 100, 5).unwrap();
        let (_, matches) = engine.place_market("ETH", 2, Side::Bid, 3).unwrap();
        assert_eq!(matches.len(), 1);

        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.market, "ETH");
        assert_eq!(batch.taker_side, Side::Bid);
        assert_eq!(batch.settlements.len(), 1);
        assert_eq!(batch.settlements[0].maker_user_id, 1);
        assert_eq!(batch.settlements[0].taker_user_id, 2);
        assert_eq!(batch.settlements[0].size, 3);
        assert_eq!(batch.settlements[0].price, 100);
    }

    #[test]
    fn resting_only_placements_dispatch_nothing() {
        let (engine, mut rx) = engine();
        engine.place_limit("ETH", 1, Side::Bid, 100, 5).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_settlement_consumer_does_not_fail_matching() {
        let (engine, rx) = engine();
        drop(rx);
        engine.place_limit("ETH", 1, Side::Ask, 100, 5).unwrap();
        let (_, matches) = engine.place_market("ETH", 2, Side::Bid, 5).unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn user_orders_track_resting_state() {
        let (engine, _rx) = engine();
        let bid_id = engine.place_limit("ETH", 7, Side::Bid, 100, 5).unwrap();
        let ask_id = engine.place_limit("ETH", 7, Side::Ask, 110, 2).unwrap();

        let orders = engine.user_orders(7);
        assert_eq!(orders.bids.len(), 1);
        assert_eq!(orders.asks.len(), 1);
        assert_eq!(orders.bids[0].order_id, bid_id);
        assert_eq!(orders.bids[0].price, 100);
        assert_eq!(orders.asks[0].order_id, ask_id);

        // A fill shrinks the reported size; a full fill drops the entry.
        engine.place_market("ETH", 8, Side::Ask, 3).unwrap();
        let orders = engine.user_orders(7);
        assert_eq!(orders.bids[0].size, 2);

        engine.place_market("ETH", 8, Side::Ask, 2).unwrap();
        let orders = engine.user_orders(7);
        assert!(orders.bids.is_empty());
        assert_eq!(orders.asks.len(), 1);

        engine.cancel(ask_id).unwrap();
        let orders = engine.user_orders(7);
        assert!(orders.asks.is_empty());
    }

    #[test]
    fn user_orders_for_unknown_user_are_empty() {
        let (engine, _rx) = engine();
        let orders = engine.user_orders(404);
        assert!(orders.bids.is_empty());
        assert!(orders.asks.is_empty());
    }

    #[test]
    fn markets_are_listed_sorted() {
        let (engine, _rx) = Engine::new(["ETH", "BTC"]);
        assert_eq!(engine.markets(), vec!["BTC".to_string(), "ETH".to_string()]);
    }

    #[test]
    fn market_rejection_reports_available_volume() {
        let (engine, _rx) = engine();
        engine.place_limit("ETH", 1, Side::Ask, 100, 4).unwrap();
        let err = engine.place_market("ETH", 2, Side::Bid, 9).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientLiquidity {
                requested: 9,
                available: 4
            }
        );
        // Nothing executed.
        assert!(engine.trades("ETH").unwrap().is_empty());
    }
}
