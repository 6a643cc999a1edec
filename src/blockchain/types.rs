//! Transaction types and error definitions.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::network::TransactionBuilder;
use thiserror::Error;

use crate::net::RelayError;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Session or transport used before it was set up.
    #[error("{0} used before initialization")]
    NotInitialized(&'static str),

    /// Network relay refused the call.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Not enough eligible tokens to form a pair.
    #[error("Not enough tokens to make a pair: {available} eligible")]
    InsufficientTokenUniverse { available: usize },

    /// No amount range configured and full-balance sweeps are disabled.
    #[error("No valid amount for {0}")]
    NoValidAmount(String),

    /// Requested token amount is larger than the wallet balance.
    #[error("Token amount {requested} is larger than balance {balance}")]
    AmountExceedsBalance { requested: U256, balance: U256 },

    /// Amount could not be parsed or drawn.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Gas estimation call failed.
    #[error("Gas estimation failed: {0}")]
    GasEstimationFailed(String),

    /// Transaction was mined with status 0.
    #[error("Transaction failed with status 0: {explorer_link}")]
    TransactionFailed { hash: TxHash, explorer_link: String },

    /// Confirmation did not arrive before the deadline. The transaction may
    /// still land.
    #[error("Transaction {hash} not confirmed after {timeout_secs} seconds")]
    TransactionTimedOut { hash: TxHash, chain_id: u64, timeout_secs: u64 },

    /// Receipt carried a status code other than 0 or 1.
    #[error("Unknown transaction status {0}")]
    UnknownTransactionStatus(u64),

    /// Chain not present in the registry.
    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    /// Route provider request or response failed.
    #[error("Quote error: {0}")]
    Quote(String),
}

impl BlockchainError {
    /// Terminal transaction status carried by this error, if any.
    pub fn terminal_status(&self) -> Option<TxStatus> {
        match self {
            BlockchainError::TransactionFailed { .. } => Some(TxStatus::Failed),
            BlockchainError::TransactionTimedOut { .. } => Some(TxStatus::TimedOut),
            _ => None,
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Lifecycle of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
    TimedOut,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Confirmed => "confirmed",
            TxStatus::Failed => "failed",
            TxStatus::TimedOut => "timed_out",
        }
    }
}

/// A transaction to submit, built fresh per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionIntent {
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl TransactionIntent {
    /// Contract call without value.
    pub fn call(to: Address, input: impl Into<Bytes>) -> Self {
        Self {
            to,
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Request used for gas estimation (no fee fields).
    pub fn to_request(&self, from: Address, chain_id: u64) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(from)
            .with_to(self.to)
            .with_input(self.input.clone())
            .with_value(self.value)
            .with_chain_id(chain_id)
    }
}

/// Gas parameters produced by estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimate {
    /// Estimated gas plus the safety buffer.
    pub gas_limit: u64,
    /// Current network gas price, or the floor when unavailable.
    pub gas_price: u128,
}

/// Minimal receipt view the pipeline needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptInfo {
    pub hash: TxHash,
    pub block_number: Option<u64>,
    /// 1 = success, 0 = reverted.
    pub status: u64,
}

/// Hash and chain of a transaction that has been broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedTransaction {
    pub hash: TxHash,
    pub chain_id: u64,
}

/// Final state of a transaction as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub hash: TxHash,
    pub status: TxStatus,
    pub explorer_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BlockchainError::Timeout(10);
        assert_eq!(err.to_string(), "RPC timeout after 10 seconds");

        let err = BlockchainError::AmountExceedsBalance {
            requested: U256::from(600),
            balance: U256::from(500),
        };
        assert!(err.to_string().contains("larger than balance"));
    }

    #[test]
    fn test_terminal_status() {
        let err = BlockchainError::TransactionTimedOut {
            hash: TxHash::ZERO,
            chain_id: 1101,
            timeout_secs: 240,
        };
        assert_eq!(err.terminal_status(), Some(TxStatus::TimedOut));
        assert!(BlockchainError::Timeout(1).terminal_status().is_none());
        assert!(!TxStatus::Pending.is_terminal());
        assert!(TxStatus::Failed.is_terminal());
    }

    #[test]
    fn test_intent_request() {
        let intent = TransactionIntent::call(Address::ZERO, vec![1u8, 2, 3]).with_value(U256::from(7));
        let req = intent.to_request(Address::ZERO, 1101);
        assert_eq!(req.value, Some(U256::from(7)));
        assert_eq!(req.chain_id, Some(1101));
    }
}
