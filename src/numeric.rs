//! Wire-format helpers for the big integers and byte arrays that cross the
//! REST/WebSocket boundary. Every amount-like value (quantity, price, secret,
//! nonce) is an `alloy_primitives::U256`; every opaque identifier (matchId,
//! commitment, nullifierHash, whitelistRoot) is a `FixedBytes<32>`. Both
//! render through these modules as decimal strings / `0x`-hex, matching the
//! "bigints as decimal strings, bytes as hex" rule for the REST surface.

use alloy_primitives::{FixedBytes, U256};
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};

pub mod u256_decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str_radix(raw.trim(), 10).map_err(|e| DeError::custom(format!("invalid decimal integer: {e}")))
    }
}

pub mod option_u256_decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(raw) => U256::from_str_radix(raw.trim(), 10)
                .map(Some)
                .map_err(|e| DeError::custom(format!("invalid decimal integer: {e}"))),
            None => Ok(None),
        }
    }
}

pub mod bytes32_hex {
    use super::*;

    pub fn serialize<S: Serializer>(value: &FixedBytes<32>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FixedBytes<32>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<FixedBytes<32>>()
            .map_err(|e| DeError::custom(format!("invalid 32-byte hex value: {e}")))
    }
}

pub mod bytes32_hex_vec {
    use super::*;

    pub fn serialize<S: Serializer>(value: &[FixedBytes<32>], serializer: S) -> Result<S::Ok, S::Error> {
        let strings: Vec<String> = value.iter().map(|v| v.to_string()).collect();
        strings.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<FixedBytes<32>>, D::Error> {
        let raw: Vec<String> = Vec::deserialize(deserializer)?;
        raw.into_iter()
            .map(|s| s.parse::<FixedBytes<32>>().map_err(|e| DeError::custom(format!("invalid 32-byte hex value: {e}"))))
            .collect()
    }
}

pub mod bytes_hex {
    use super::*;

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(raw.trim_start_matches("0x")).map_err(|e| DeError::custom(format!("invalid hex bytes: {e}")))
    }
}
