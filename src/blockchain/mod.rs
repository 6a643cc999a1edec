//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Signing key + name
//!     → wallet.rs (session bound to the settlement chain)
//!     → client.rs (RPC handle per call, timeouts, optional proxy transport)
//!     → tokens.rs / erc20.rs (balances, pair selection, contract calls)
//!     → amount.rs (amount draw, allowance top-up)
//!     → transaction.rs (gas gate, estimate, submit, confirm)
//!     → poller.rs (wait for cross-chain arrival)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod amount;
pub mod client;
pub mod erc20;
pub mod poller;
pub mod tokens;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{AlloyRpc, ChainRpc, RpcFactory};
pub use tokens::{AmountRange, PairFallback, PairRequest, Token, TokenRegistry};
pub use transaction::TxPipeline;
pub use types::{BlockchainError, BlockchainResult, TransactionIntent, TransactionOutcome, TxStatus};
pub use wallet::{SigningKey, WalletSession};
