use std::collections::VecDeque;

use crate::order::Order;
use crate::types::{Match, OrderId, PriceTicks, Side, SizeLots};

/// The cached volume disagreed with the orders in the queue. The book treats
/// this as a poisoning condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeMismatch;

/// FIFO queue of resting orders sharing one price, with the cached sum of
/// their remaining sizes.
///
/// Orders arrive with monotonically increasing ids, so the queue is always
/// id-sorted and lookups use binary search. All volume arithmetic is
/// checked; a mismatch is reported instead of wrapping.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: PriceTicks,
    orders: VecDeque<Order>,
    total_volume: SizeLots,
}

impl PriceLevel {
    pub fn new(price: PriceTicks) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_volume: 0,
        }
    }

    pub fn price(&self) -> PriceTicks {
        self.price
    }

    pub fn total_volume(&self) -> SizeLots {
        self.total_volume
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        let index = self.orders.binary_search_by_key(&order_id, |o| o.id).ok()?;
        self.orders.get(index)
    }

    /// Appends an order at the tail (time priority) and grows the cached
    /// volume. On failure the level is unchanged.
    pub fn add(&mut self, order: Order) -> Result<(), VolumeMismatch> {
        debug_assert!(!order.is_filled(), "filled order added to level");
        let Some(total) = self.total_volume.checked_add(order.remaining) else {
            return Err(VolumeMismatch);
        };
        self.total_volume = total;
        self.orders.push_back(order);
        Ok(())
    }

    /// Unlinks an order by id, returning it. `Ok(None)` if it is not resting
    /// here.
    pub fn remove(&mut self, order_id: OrderId) -> Result<Option<Order>, VolumeMismatch> {
        let Ok(index) = self.orders.binary_search_by_key(&order_id, |o| o.id) else {
            return Ok(None);
        };
        let Some(order) = self.orders.remove(index) else {
            return Ok(None);
        };
        let Some(total) = self.total_volume.checked_sub(order.remaining) else {
            return Err(VolumeMismatch);
        };
        self.total_volume = total;
        Ok(Some(order))
    }

    /// Consumes resting orders in FIFO order against `taker` until the taker
    /// is filled or the level is exhausted.
    ///
    /// Maker and taker are reduced in lockstep by the same fill size; makers
    /// that reach zero are removed. Matches execute at this level's price.
    pub fn fill(&mut self, taker: &mut Order) -> Result<Vec<Match>, VolumeMismatch> {
        let mut matches = Vec::new();

        while !taker.is_filled() {
            let Some(maker) = self.orders.front_mut() else {
                break;
            };

            let size_filled = maker.remaining.min(taker.remaining);
            if !maker.reduce(size_filled) || !taker.reduce(size_filled) {
                return Err(VolumeMismatch);
            }
            let maker_id = maker.id;
            let maker_user_id = maker.user_id;
            let maker_filled = maker.is_filled();

            let Some(total) = self.total_volume.checked_sub(size_filled) else {
                return Err(VolumeMismatch);
            };
            self.total_volume = total;
            matches.push(match taker.side {
                Side::Bid => Match {
                    bid_order_id: taker.id,
                    ask_order_id: maker_id,
                    bid_user_id: taker.user_id,
                    ask_user_id: maker_user_id,
                    size_filled,
                    price: self.price,
                },
                Side::Ask => Match {
                    bid_order_id: maker_id,
                    ask_order_id: taker.id,
                    bid_user_id: maker_user_id,
                    ask_user_id: taker.user_id,
                    size_filled,
                    price: self.price,
                },
            });

            if maker_filled {
                self.orders.pop_front();
            }
        }

        Ok(matches)
    }
}
