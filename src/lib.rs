//! Multi-wallet on-chain transaction conductor.
//!
//! # Architecture Overview
//!
//! ```text
//!   identities ──▶ runner ──▶ IdentityContext (session + relay, one per identity)
//!                                   │
//!                                   ▼
//!                               modules (swap | bridge | wrap)
//!                                   │
//!          ┌────────────────────────┼───────────────────────────┐
//!          ▼                        ▼                           ▼
//!   blockchain::tokens      blockchain::amount          quoting (route APIs)
//!   (pair selection)        (amount + approval)                 │
//!          │                        │                           │
//!          └──────────────▶ blockchain::transaction ◀───────────┘
//!                           (gas gate, submit, confirm)
//!                                   │
//!                                   ▼
//!                           blockchain::poller (bridge arrival)
//!
//!   All HTTP and RPC traffic goes through net::NetworkRelay.
//! ```

pub mod blockchain;
pub mod chains;
pub mod config;
pub mod context;
pub mod modules;
pub mod net;
pub mod observability;
pub mod quoting;
pub mod record;
pub mod resilience;
pub mod runner;

pub use config::AppConfig;
pub use context::{IdentityContext, Services};
pub use runner::{Identity, RunSummary, Runner};
