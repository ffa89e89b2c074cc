//! Per-asset order book and the exact-quantity matcher.
//!
//! The commitment scheme binds a fixed quantity into the ZK proof a match
//! will later need, so unlike the teacher's `Orderbook` (which fills the
//! `min(taker, maker)` amount and leaves a partial remainder resting), this
//! book only ever matches two orders whose quantities are exactly equal.
//! Anything else is left resting — there is no partial-fill path at all.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use alloy_primitives::U256;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::models::order::{PrivateOrder, Side};
use crate::models::order_match::Match;

use super::types::{DepthLevel, OrderEntry, PriceLevel};

pub struct SubmitOutcome {
    pub matched: Option<Match>,
    pub no_match_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookSnapshot {
    pub buys: Vec<DepthLevel>,
    pub sells: Vec<DepthLevel>,
}

pub struct OrderBook {
    pub asset_address: alloy_primitives::Address,
    bids: RwLock<BTreeMap<PriceLevel, VecDeque<OrderEntry>>>,
    asks: RwLock<BTreeMap<PriceLevel, VecDeque<OrderEntry>>>,
    order_index: DashMap<u64, (Side, PriceLevel)>,
    next_sequence: AtomicU64,
}

impl OrderBook {
    pub fn new(asset_address: alloy_primitives::Address) -> Self {
        Self {
            asset_address,
            bids: RwLock::new(BTreeMap::new()),
            asks: RwLock::new(BTreeMap::new()),
            order_index: DashMap::new(),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Try to match `order` against the resting book; if no exact-quantity
    /// crossing counterparty exists, admit it to rest on its own side.
    pub fn submit(&self, order: PrivateOrder) -> SubmitOutcome {
        match order.side {
            Side::Buy => self.match_incoming(order, Side::Buy),
            Side::Sell => self.match_incoming(order, Side::Sell),
        }
    }

    fn match_incoming(&self, incoming: PrivateOrder, side: Side) -> SubmitOutcome {
        let found = match side {
            Side::Buy => self.find_crossing_sell(incoming.price, incoming.quantity),
            Side::Sell => self.find_crossing_buy(incoming.price, incoming.quantity),
        };

        match found {
            Some(resting) => {
                let (buy_order, sell_order) = match side {
                    Side::Buy => (incoming, resting),
                    Side::Sell => (resting, incoming),
                };
                let execution_price = Match::midpoint_price(buy_order.price, sell_order.price);
                let execution_quantity = buy_order.quantity;
                let matched = Match {
                    match_id: crate::services::orderbook::next_match_id(),
                    buy_order,
                    sell_order,
                    execution_price,
                    execution_quantity,
                    timestamp: chrono::Utc::now().timestamp(),
                };
                SubmitOutcome {
                    matched: Some(matched),
                    no_match_reason: None,
                }
            }
            None => {
                let no_match_reason = self.describe_counterparty_side(side);
                self.insert(incoming);
                SubmitOutcome {
                    matched: None,
                    no_match_reason,
                }
            }
        }
    }

    /// Builds the §4.1 no-match diagnostic by enumerating the opposite
    /// book's visible `(price, quantity)` levels, best price first. Returns
    /// `None` when that side is empty — there is nothing to enumerate.
    fn describe_counterparty_side(&self, incoming_side: Side) -> Option<String> {
        let (label, levels) = match incoming_side {
            Side::Buy => {
                let asks = self.asks.read();
                if asks.is_empty() {
                    return None;
                }
                let levels = asks
                    .iter()
                    .map(|(level, queue)| (level.0, queue.iter().fold(U256::ZERO, |acc, e| acc + e.quantity())))
                    .collect::<Vec<_>>();
                ("sell", levels)
            }
            Side::Sell => {
                let bids = self.bids.read();
                if bids.is_empty() {
                    return None;
                }
                let levels = bids
                    .iter()
                    .rev()
                    .map(|(level, queue)| (level.0, queue.iter().fold(U256::ZERO, |acc, e| acc + e.quantity())))
                    .collect::<Vec<_>>();
                ("buy", levels)
            }
        };

        let enumerated = levels
            .iter()
            .map(|(price, quantity)| format!("price={price} quantity={quantity}"))
            .collect::<Vec<_>>()
            .join(", ");

        Some(format!(
            "no resting {label} order at a crossing price with an exactly equal quantity; visible {label} side: {enumerated}"
        ))
    }

    /// Scan ask levels ascending (best price first); within a level, FIFO.
    fn find_crossing_sell(&self, buy_price: U256, quantity: U256) -> Option<PrivateOrder> {
        let mut asks = self.asks.write();
        let mut empty_level: Option<PriceLevel> = None;
        let mut found: Option<(PriceLevel, usize)> = None;

        for (level, queue) in asks.iter() {
            if level.0 > buy_price {
                break;
            }
            if let Some(pos) = queue.iter().position(|entry| entry.quantity() == quantity) {
                found = Some((*level, pos));
                break;
            }
        }

        let (level, pos) = found?;
        let queue = asks.get_mut(&level)?;
        let entry = queue.remove(pos)?;
        if queue.is_empty() {
            empty_level = Some(level);
        }
        drop(asks);
        if let Some(level) = empty_level {
            self.asks.write().remove(&level);
        }
        self.order_index.remove(&entry.sequence);
        Some(entry.order)
    }

    /// Scan bid levels descending (best price first); within a level, FIFO.
    fn find_crossing_buy(&self, sell_price: U256, quantity: U256) -> Option<PrivateOrder> {
        let mut bids = self.bids.write();
        let mut empty_level: Option<PriceLevel> = None;
        let mut found: Option<(PriceLevel, usize)> = None;

        for (level, queue) in bids.iter().rev() {
            if level.0 < sell_price {
                break;
            }
            if let Some(pos) = queue.iter().position(|entry| entry.quantity() == quantity) {
                found = Some((*level, pos));
                break;
            }
        }

        let (level, pos) = found?;
        let queue = bids.get_mut(&level)?;
        let entry = queue.remove(pos)?;
        if queue.is_empty() {
            empty_level = Some(level);
        }
        drop(bids);
        if let Some(level) = empty_level {
            self.bids.write().remove(&level);
        }
        self.order_index.remove(&entry.sequence);
        Some(entry.order)
    }

    fn insert(&self, order: PrivateOrder) {
        let sequence = self.next_sequence.fetch_add(1, AtomicOrdering::Relaxed);
        let level = PriceLevel::new(order.price);
        let side = order.side;
        let entry = OrderEntry { order, sequence };

        match side {
            Side::Buy => {
                self.bids.write().entry(level).or_default().push_back(entry);
            }
            Side::Sell => {
                self.asks.write().entry(level).or_default().push_back(entry);
            }
        }
        self.order_index.insert(sequence, (side, level));
    }

    pub fn snapshot(&self) -> BookSnapshot {
        let bids = self.bids.read();
        let asks = self.asks.read();

        let buys = bids
            .iter()
            .rev()
            .map(|(level, queue)| DepthLevel {
                price: level.0.to_string(),
                quantity: queue.iter().fold(U256::ZERO, |acc, e| acc + e.quantity()).to_string(),
            })
            .collect();

        let sells = asks
            .iter()
            .map(|(level, queue)| DepthLevel {
                price: level.0.to_string(),
                quantity: queue.iter().fold(U256::ZERO, |acc, e| acc + e.quantity()).to_string(),
            })
            .collect();

        BookSnapshot { buys, sells }
    }

    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, FixedBytes};

    fn order(side: Side, price: u64, quantity: u64) -> PrivateOrder {
        PrivateOrder {
            commitment: FixedBytes::from([1u8; 32]),
            trader: Address::repeat_byte(0x01),
            asset_address: Address::repeat_byte(0x02),
            side,
            quantity: U256::from(quantity),
            price: U256::from(price),
            secret: U256::from(1u64),
            nonce: U256::from(1u64),
            timestamp: 0,
            expiry: i64::MAX,
            whitelist_index: 0,
        }
    }

    #[test]
    fn exact_quantity_crossing_orders_match_at_midpoint() {
        let book = OrderBook::new(Address::repeat_byte(0x02));
        book.submit(order(Side::Sell, 100, 10));
        let outcome = book.submit(order(Side::Buy, 110, 10));

        let matched = outcome.matched.expect("should match");
        assert_eq!(matched.execution_price, U256::from(105u64));
        assert_eq!(matched.execution_quantity, U256::from(10u64));
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn quantity_mismatch_never_crosses_even_at_compatible_price() {
        let book = OrderBook::new(Address::repeat_byte(0x02));
        book.submit(order(Side::Sell, 100, 10));
        let outcome = book.submit(order(Side::Buy, 110, 7));

        assert!(outcome.matched.is_none());
        assert!(outcome.no_match_reason.is_some());
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn price_time_priority_picks_best_price_first() {
        let book = OrderBook::new(Address::repeat_byte(0x02));
        book.submit(order(Side::Sell, 105, 10));
        book.submit(order(Side::Sell, 100, 10));
        let outcome = book.submit(order(Side::Buy, 105, 10));

        let matched = outcome.matched.expect("should match");
        assert_eq!(matched.sell_order.price, U256::from(100u64));
    }

    #[test]
    fn no_match_reason_enumerates_visible_counterparty_levels() {
        let book = OrderBook::new(Address::repeat_byte(0x02));
        book.submit(order(Side::Sell, 100, 10));
        book.submit(order(Side::Sell, 105, 5));
        let outcome = book.submit(order(Side::Buy, 110, 7));

        let reason = outcome.no_match_reason.expect("sell side is non-empty");
        assert!(reason.contains("price=100 quantity=10"));
        assert!(reason.contains("price=105 quantity=5"));
    }

    #[test]
    fn no_match_reason_is_none_when_counterparty_side_is_empty() {
        let book = OrderBook::new(Address::repeat_byte(0x02));
        let outcome = book.submit(order(Side::Buy, 110, 7));

        assert!(outcome.matched.is_none());
        assert!(outcome.no_match_reason.is_none());
    }

    #[test]
    fn non_crossing_orders_rest_on_both_sides() {
        let book = OrderBook::new(Address::repeat_byte(0x02));
        book.submit(order(Side::Buy, 90, 10));
        let outcome = book.submit(order(Side::Sell, 100, 10));

        assert!(outcome.matched.is_none());
        let snapshot = book.snapshot();
        assert_eq!(snapshot.buys.len(), 1);
        assert_eq!(snapshot.sells.len(), 1);
    }
}
