//! Module orchestration.
//!
//! # Data Flow
//! ```text
//! Module::run(ctx)
//!     → Setup        (pick pair / source chain)
//!     → Act          (quote → amount & approval → pipeline)
//!     → SecondaryAct (after a randomized delay, when enabled)
//!     → Done
//!
//! Failure → errors.rs (retry after funds arrive | skip | fatal)
//! ```
//!
//! # Design Decisions
//! - Modules are a closed enum; capabilities are flags, not overrides
//! - `run` must never be called for two identities at once

pub mod bridge;
pub mod dex;
pub mod errors;
pub mod wrap;

use std::sync::Arc;

use crate::blockchain::types::BlockchainResult;
use crate::chains::{Chain, ChainRegistry};
use crate::config::{BridgeVenue, ModuleConfig, SwapVenue};
use crate::context::IdentityContext;
use crate::observability::metrics;
use crate::quoting::{BridgeRouter, ParaswapRouter, SwapRouter, XyFinanceRouter};
use crate::resilience::cooldown;

pub use bridge::BridgeModule;
pub use dex::{normalize_pair, SwapModule};
pub use errors::{handle_module_error, ErrorDisposition};
pub use wrap::WrapModule;

/// Stages a module moves through in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Act,
    SecondaryAct,
    Done,
}

/// Which stages a module performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub setup: bool,
    pub secondary_act: bool,
}

pub enum Module {
    Swap(SwapModule),
    Bridge(BridgeModule),
    Wrap(WrapModule),
}

impl Module {
    /// Build a module with its configured route provider.
    pub fn from_config(config: &ModuleConfig, chains: &ChainRegistry) -> BlockchainResult<Self> {
        Ok(match config {
            ModuleConfig::Swap(swap) => {
                let router: Arc<dyn SwapRouter> = match swap.venue {
                    SwapVenue::Quickswap => Arc::new(ParaswapRouter::new(
                        swap.api_url.as_deref(),
                        chains.get_numeric_id(Chain::SETTLEMENT)?,
                    )),
                };
                Module::Swap(SwapModule::new(swap.clone(), router))
            }
            ModuleConfig::Bridge(bridge) => {
                let router: Arc<dyn BridgeRouter> = match bridge.venue {
                    BridgeVenue::XyFinance => Arc::new(XyFinanceRouter::new(bridge.api_url.as_deref())),
                };
                Module::Bridge(BridgeModule::new(bridge.clone(), router))
            }
            ModuleConfig::Wrap(wrap) => Module::Wrap(WrapModule::new(wrap.clone())),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Module::Swap(_) => "swap",
            Module::Bridge(_) => "bridge",
            Module::Wrap(_) => "wrap",
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Module::Swap(m) => Capabilities {
                setup: true,
                secondary_act: m.config().add_liquidity,
            },
            Module::Bridge(_) => Capabilities {
                setup: true,
                secondary_act: false,
            },
            Module::Wrap(_) => Capabilities {
                setup: false,
                secondary_act: false,
            },
        }
    }

    /// Chain whose balance a funding error should wait on.
    pub fn home_chain(&self) -> Chain {
        match self {
            Module::Swap(_) | Module::Bridge(_) => Chain::SETTLEMENT,
            Module::Wrap(m) => m.chain(),
        }
    }

    async fn setup(&mut self, ctx: &IdentityContext) -> BlockchainResult<()> {
        match self {
            Module::Swap(m) => m.setup(ctx).await,
            Module::Bridge(m) => m.setup(),
            Module::Wrap(_) => Ok(()),
        }
    }

    async fn act(&mut self, ctx: &IdentityContext) -> BlockchainResult<()> {
        match self {
            Module::Swap(m) => m.act(ctx).await,
            Module::Bridge(m) => m.act(ctx).await,
            Module::Wrap(m) => m.act(ctx).await,
        }
    }

    async fn secondary_act(&mut self, ctx: &IdentityContext) -> BlockchainResult<()> {
        match self {
            Module::Swap(m) => m.add_liquidity(ctx).await,
            Module::Bridge(_) | Module::Wrap(_) => Ok(()),
        }
    }

    /// Drive the module through its stages once.
    pub async fn run(&mut self, ctx: &IdentityContext) -> BlockchainResult<()> {
        let caps = self.capabilities();
        let mut stage = Stage::Setup;

        loop {
            tracing::debug!(module = self.kind(), stage = ?stage, "Module stage");
            stage = match stage {
                Stage::Setup => {
                    if caps.setup {
                        self.setup(ctx).await?;
                    }
                    Stage::Act
                }
                Stage::Act => {
                    self.act(ctx).await?;
                    if caps.secondary_act {
                        Stage::SecondaryAct
                    } else {
                        Stage::Done
                    }
                }
                Stage::SecondaryAct => {
                    cooldown(&ctx.config.delays.secondary_act, "before secondary act").await;
                    self.secondary_act(ctx).await?;
                    Stage::Done
                }
                Stage::Done => {
                    metrics::record_module_run(self.kind(), "completed");
                    return Ok(());
                }
            };
        }
    }
}
