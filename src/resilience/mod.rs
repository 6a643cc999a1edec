//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Confirmed submission → cooldown.rs (45–90s)
//! Before secondary act → cooldown.rs (60–120s)
//! Between modules / identities → cooldown.rs (minutes)
//! ```
//!
//! # Design Decisions
//! - Waits are plain sleeps, never busy loops
//! - No automatic retries here; the driver loop owns retry policy

pub mod cooldown;

pub use cooldown::{cooldown, draw_delay};
