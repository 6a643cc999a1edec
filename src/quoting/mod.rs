//! Route provider clients.
//!
//! # Data Flow
//! ```text
//! Module (pair, amount)
//!     → router.rs (SwapRouter / BridgeRouter seams)
//!     → paraswap.rs | xy_finance.rs (HTTP through the identity's relay)
//!     → TransactionIntent handed to the pipeline
//! ```

pub mod paraswap;
pub mod router;
pub mod types;
pub mod xy_finance;

pub use paraswap::ParaswapRouter;
pub use router::{BridgeRouter, SwapRouter};
pub use types::{BridgeQuoteRequest, SwapQuoteRequest, TxPayload};
pub use xy_finance::XyFinanceRouter;
