//! Chain registry subsystem.
//!
//! # Data Flow
//! ```text
//! config [chains.<name>] rpc overrides
//!     → registry.rs (static table, immutable after load)
//!     → explorer links / numeric id lookups
//!     → per-call RPC handles (blockchain::client)
//! ```

pub mod registry;

pub use registry::{Chain, ChainInfo, ChainRegistry};
