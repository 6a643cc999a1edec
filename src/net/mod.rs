//! Network relay subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyHandle (per identity, optional)
//!     → relay.rs (bind client, look up IP direct and via proxy)
//!     → fingerprint.rs (one randomized header set per identity)
//!     → reqwest::Client handed to quote providers and chain RPC
//!
//! Relay States:
//!     Unbound → Bound(direct | proxied)
//! ```
//!
//! # Design Decisions
//! - Every transport accessor fails until initialization succeeds
//! - A relay lives exactly as long as one identity's context

pub mod fingerprint;
pub mod relay;

pub use crate::config::ProxyHandle;
pub use relay::{check_anonymity, NetworkRelay, RelayError};
