use alloy_primitives::{Address, FixedBytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::numeric::{bytes32_hex, u256_decimal};
use crate::utils::response::AppError;

/// Buy/sell side of a private order.
///
/// Wire encoding is `0` (buy) / `1` (sell), per the REST surface's
/// `side∈{0,1}` validation rule rather than a string tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    Buy,
    Sell,
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Side::Buy),
            1 => Ok(Side::Sell),
            other => Err(format!("side must be 0 (buy) or 1 (sell), got {other}")),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        match side {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// A trader's order against the ZK commitment scheme.
///
/// `secret` and `nonce` never leave the engine in any event payload or log
/// line — they are the witness values that let the trader later prove the
/// commitment opens correctly; the engine only needs them to pass through to
/// the proof oracle at match time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateOrder {
    #[serde(with = "bytes32_hex")]
    pub commitment: FixedBytes<32>,
    pub trader: Address,
    pub asset_address: Address,
    pub side: Side,
    #[serde(with = "u256_decimal")]
    pub quantity: U256,
    #[serde(with = "u256_decimal")]
    pub price: U256,
    #[serde(with = "u256_decimal")]
    pub secret: U256,
    #[serde(with = "u256_decimal")]
    pub nonce: U256,
    pub timestamp: i64,
    pub expiry: i64,
    pub whitelist_index: u64,
}

/// Errors validating a [`PrivateOrder`] before it is admitted to the book.
#[derive(Debug, thiserror::Error)]
pub enum OrderValidationError {
    #[error("quantity must be greater than zero")]
    ZeroQuantity,
    #[error("price must be greater than zero")]
    ZeroPrice,
    #[error("timestamp ({timestamp}) is after expiry ({expiry})")]
    TimestampAfterExpiry { timestamp: i64, expiry: i64 },
}

impl From<OrderValidationError> for AppError {
    fn from(err: OrderValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl PrivateOrder {
    /// Invariants from the data model: quantity>0, price>0, timestamp<=expiry.
    /// Whether `whitelist_index` actually resolves to a whitelisted trader is
    /// checked separately by the whitelist service, not here — this order
    /// shape is valid independent of whitelist membership.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.quantity.is_zero() {
            return Err(OrderValidationError::ZeroQuantity);
        }
        if self.price.is_zero() {
            return Err(OrderValidationError::ZeroPrice);
        }
        if self.timestamp > self.expiry {
            return Err(OrderValidationError::TimestampAfterExpiry {
                timestamp: self.timestamp,
                expiry: self.expiry,
            });
        }
        Ok(())
    }

    /// True once `now` has passed this order's expiry. The matcher only
    /// consults this at submit time — there is no background sweeper that
    /// removes already-resting orders once they expire (see DESIGN.md, Open
    /// Question c).
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order(side: Side, quantity: u64, price: u64) -> PrivateOrder {
        PrivateOrder {
            commitment: FixedBytes::from([1u8; 32]),
            trader: Address::repeat_byte(0xAA),
            asset_address: Address::repeat_byte(0xBB),
            side,
            quantity: U256::from(quantity),
            price: U256::from(price),
            secret: U256::from(42u64),
            nonce: U256::from(7u64),
            timestamp: 100,
            expiry: 200,
            whitelist_index: 0,
        }
    }

    #[test]
    fn side_round_trips_through_wire_ints() {
        assert_eq!(u8::from(Side::Buy), 0);
        assert_eq!(u8::from(Side::Sell), 1);
        assert_eq!(Side::try_from(0).unwrap(), Side::Buy);
        assert_eq!(Side::try_from(1).unwrap(), Side::Sell);
        assert!(Side::try_from(2).is_err());
    }

    #[test]
    fn rejects_zero_quantity() {
        let order = sample_order(Side::Buy, 0, 100);
        assert!(matches!(order.validate(), Err(OrderValidationError::ZeroQuantity)));
    }

    #[test]
    fn rejects_zero_price() {
        let order = sample_order(Side::Buy, 10, 0);
        assert!(matches!(order.validate(), Err(OrderValidationError::ZeroPrice)));
    }

    #[test]
    fn rejects_timestamp_after_expiry() {
        let mut order = sample_order(Side::Buy, 10, 100);
        order.timestamp = 300;
        assert!(matches!(
            order.validate(),
            Err(OrderValidationError::TimestampAfterExpiry { .. })
        ));
    }

    #[test]
    fn expiry_is_checked_only_against_a_given_instant() {
        let order = sample_order(Side::Sell, 10, 100);
        assert!(!order.is_expired(150));
        assert!(order.is_expired(250));
    }
}
