//! Route provider request and payload types.

use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer};

use crate::blockchain::types::TransactionIntent;

/// Input to a swap route lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuoteRequest {
    pub src_token: Address,
    pub dst_token: Address,
    pub src_decimals: u8,
    pub dst_decimals: u8,
    /// Raw amount of `src_token` to sell.
    pub amount: U256,
    /// Sender and receiver.
    pub user: Address,
}

/// Input to a native-to-native bridge route lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeQuoteRequest {
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    pub amount: U256,
    pub receiver: Address,
}

/// Ready-to-sign call returned by a route provider.
#[derive(Debug, Clone, Deserialize)]
pub struct TxPayload {
    pub to: Address,
    pub data: Bytes,
    #[serde(default, deserialize_with = "de_u256")]
    pub value: U256,
}

impl TxPayload {
    pub fn into_intent(self) -> TransactionIntent {
        TransactionIntent::call(self.to, self.data).with_value(self.value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

/// Accepts `"0x…"` hex, decimal strings, and plain numbers.
pub fn de_u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(U256::ZERO),
        Some(NumberOrString::Number(n)) => Ok(U256::from(n)),
        Some(NumberOrString::String(s)) if s.is_empty() => Ok(U256::ZERO),
        Some(NumberOrString::String(s)) => U256::from_str(&s).map_err(serde::de::Error::custom),
    }
}
