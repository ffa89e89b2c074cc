use alloy_primitives::U256;
use serde::Serialize;

use crate::models::order::{PrivateOrder, Side};

/// Total ordering wrapper around a `U256` price so it can key a `BTreeMap`.
/// Both books store entries under ascending keys; the matcher reads bids
/// back-to-front (`next_back()`) for highest-first and asks front-to-back
/// (`next()`) for lowest-first, the same convention the teacher's
/// `Orderbook` uses for its `Decimal`-keyed books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriceLevel(pub U256);

impl PriceLevel {
    pub fn new(price: U256) -> Self {
        Self(price)
    }
}

/// A resting order plus the strictly-increasing sequence number it was
/// admitted under, used only to break ties when snapshotting (price levels
/// already give FIFO order within themselves via `VecDeque`).
#[derive(Debug, Clone)]
pub struct OrderEntry {
    pub order: PrivateOrder,
    pub sequence: u64,
}

impl OrderEntry {
    pub fn side(&self) -> Side {
        self.order.side
    }

    pub fn price(&self) -> U256 {
        self.order.price
    }

    pub fn quantity(&self) -> U256 {
        self.order.quantity
    }
}

/// A decimal-string price/quantity pair for the aggregated depth view
/// returned by `bookSnapshot`.
#[derive(Debug, Clone, Serialize)]
pub struct DepthLevel {
    pub price: String,
    pub quantity: String,
}
