use alloy_primitives::{FixedBytes, U256};
use serde::{Deserialize, Serialize};

use crate::numeric::{bytes32_hex, u256_decimal};

use super::order::PrivateOrder;

/// A matched buy/sell pair produced by the order book.
///
/// Self-trading (the same trader on both sides) is neither detected nor
/// rejected — see DESIGN.md Open Question (a). Duplicate commitments are
/// likewise allowed to both match — Open Question (b).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(with = "bytes32_hex")]
    pub match_id: FixedBytes<32>,
    pub buy_order: PrivateOrder,
    pub sell_order: PrivateOrder,
    #[serde(with = "u256_decimal")]
    pub execution_price: U256,
    #[serde(with = "u256_decimal")]
    pub execution_quantity: U256,
    pub timestamp: i64,
}

impl Match {
    /// `floor((buy.price + sell.price) / 2)` — integer division already
    /// floors for non-negative operands.
    pub fn midpoint_price(buy_price: U256, sell_price: U256) -> U256 {
        (buy_price + sell_price) / U256::from(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_floors_odd_sums() {
        let price = Match::midpoint_price(U256::from(101u64), U256::from(100u64));
        assert_eq!(price, U256::from(100u64));
    }

    #[test]
    fn midpoint_is_exact_for_even_sums() {
        let price = Match::midpoint_price(U256::from(100u64), U256::from(100u64));
        assert_eq!(price, U256::from(100u64));
    }
}
