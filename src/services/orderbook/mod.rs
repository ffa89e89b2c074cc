pub mod book;
pub mod types;

use std::collections::VecDeque;
use std::sync::Arc;

use alloy_primitives::{Address, FixedBytes};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rand::RngCore;

use crate::events::EventBus;
use crate::models::order::PrivateOrder;
use crate::models::order_match::Match;
use crate::models::Event;

pub use book::{BookSnapshot, OrderBook, SubmitOutcome};
pub use types::{DepthLevel, OrderEntry, PriceLevel};

/// A fresh random 256-bit match identifier. Collisions are astronomically
/// unlikely at any realistic match volume and are not guarded against, the
/// same tradeoff the spec's `commitment`/`nullifierHash` hex identifiers
/// make implicitly.
pub fn next_match_id() -> FixedBytes<32> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    FixedBytes::from(bytes)
}

pub struct SubmitResult {
    pub matched: bool,
    pub pending_match: Option<Match>,
    pub no_match_reason: Option<String>,
}

/// Aggregates one [`OrderBook`] per traded asset plus the append-only
/// completed-match log and the queue the proof orchestrator drains.
/// Unbounded growth of `completed` is intentional — see DESIGN.md, Open
/// Question (e).
pub struct MatchingEngine {
    books: DashMap<Address, Arc<OrderBook>>,
    completed: RwLock<Vec<Match>>,
    queue: Mutex<VecDeque<Match>>,
    event_bus: Arc<EventBus>,
}

impl MatchingEngine {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            books: DashMap::new(),
            completed: RwLock::new(Vec::new()),
            queue: Mutex::new(VecDeque::new()),
            event_bus,
        }
    }

    fn book_for(&self, asset: Address) -> Arc<OrderBook> {
        self.books
            .entry(asset)
            .or_insert_with(|| Arc::new(OrderBook::new(asset)))
            .clone()
    }

    /// `submit(order)` from spec §4.1: validates, attempts an exact-quantity
    /// match, and on success records the match, queues it for the proof
    /// orchestrator, and emits `order:matched`; otherwise the order rests in
    /// the book and `order:submitted` is emitted.
    pub fn submit(&self, order: PrivateOrder) -> Result<SubmitResult, crate::models::order::OrderValidationError> {
        order.validate()?;

        self.event_bus.emit(Event::OrderSubmitted {
            asset_address: order.asset_address,
            trader: order.trader,
        });

        let book = self.book_for(order.asset_address);
        let SubmitOutcome { matched, no_match_reason } = book.submit(order);

        if let Some(matched) = &matched {
            self.completed.write().push(matched.clone());
            self.queue.lock().push_back(matched.clone());
            self.event_bus.emit(Event::OrderMatched {
                matched: Box::new(matched.clone()),
            });
        }

        Ok(SubmitResult {
            matched: matched.is_some(),
            pending_match: matched,
            no_match_reason,
        })
    }

    pub fn book_snapshot(&self, asset: Address) -> BookSnapshot {
        match self.books.get(&asset) {
            Some(book) => book.snapshot(),
            None => BookSnapshot { buys: Vec::new(), sells: Vec::new() },
        }
    }

    pub fn completed(&self) -> Vec<Match> {
        self.completed.read().clone()
    }

    pub fn by_match_id(&self, match_id: FixedBytes<32>) -> Option<Match> {
        self.completed.read().iter().find(|m| m.match_id == match_id).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Pop every queued match for the proof orchestrator to process. Pulling
    /// the whole queue out under the lock and handing ownership to the
    /// caller keeps the lock held for microseconds, per the "lock -> read ->
    /// unlock -> I/O" discipline in §5.
    pub fn drain_queue(&self) -> Vec<Match> {
        let mut queue = self.queue.lock();
        queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::Side;

    fn order(side: Side, price: u64, quantity: u64, asset: Address) -> PrivateOrder {
        PrivateOrder {
            commitment: FixedBytes::from([1u8; 32]),
            trader: Address::repeat_byte(0x01),
            asset_address: asset,
            side,
            quantity: alloy_primitives::U256::from(quantity),
            price: alloy_primitives::U256::from(price),
            secret: alloy_primitives::U256::from(1u64),
            nonce: alloy_primitives::U256::from(1u64),
            timestamp: 0,
            expiry: i64::MAX,
            whitelist_index: 0,
        }
    }

    #[test]
    fn matched_orders_are_queued_for_the_proof_orchestrator() {
        let bus = Arc::new(EventBus::new());
        let engine = MatchingEngine::new(bus);
        let asset = Address::repeat_byte(0x09);

        engine.submit(order(Side::Sell, 100, 5, asset)).unwrap();
        let result = engine.submit(order(Side::Buy, 100, 5, asset)).unwrap();

        assert!(result.matched);
        assert_eq!(engine.pending_count(), 1);
        assert_eq!(engine.completed().len(), 1);

        let drained = engine.drain_queue();
        assert_eq!(drained.len(), 1);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn each_asset_has_an_independent_book() {
        let bus = Arc::new(EventBus::new());
        let engine = MatchingEngine::new(bus);
        let asset_a = Address::repeat_byte(0x0A);
        let asset_b = Address::repeat_byte(0x0B);

        engine.submit(order(Side::Buy, 100, 5, asset_a)).unwrap();
        let snapshot_b = engine.book_snapshot(asset_b);
        assert!(snapshot_b.buys.is_empty());

        let snapshot_a = engine.book_snapshot(asset_a);
        assert_eq!(snapshot_a.buys.len(), 1);
    }
}
