//! Native bridge into the settlement chain.

use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::blockchain::amount::setup_amount;
use crate::blockchain::poller::poll_balance;
use crate::blockchain::tokens::Token;
use crate::blockchain::transaction::TxPipeline;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::chains::Chain;
use crate::config::BridgeConfig;
use crate::context::IdentityContext;
use crate::quoting::{BridgeQuoteRequest, BridgeRouter};

const GWEI: u128 = 1_000_000_000;

/// Tip added on top of the source chain's base fee.
pub const PRIORITY_FEE: u128 = 1_500_000_000;

/// Base fee assumed when the latest block reports none.
pub const FALLBACK_BASE_FEE: u128 = 17 * GWEI;

/// EIP-1559 fee pair `(max_fee, max_priority_fee)` for `base_fee`.
pub fn bridge_fees(base_fee: Option<u128>) -> (u128, u128) {
    let base = base_fee.unwrap_or(FALLBACK_BASE_FEE);
    (base + PRIORITY_FEE, PRIORITY_FEE)
}

pub struct BridgeModule {
    config: BridgeConfig,
    router: Arc<dyn BridgeRouter>,
    source: Option<Chain>,
}

impl BridgeModule {
    pub fn new(config: BridgeConfig, router: Arc<dyn BridgeRouter>) -> Self {
        Self {
            config,
            router,
            source: None,
        }
    }

    pub fn source(&self) -> Option<Chain> {
        self.source
    }

    /// Draw the source chain for this run.
    pub fn setup(&mut self) -> BlockchainResult<()> {
        let source = *self
            .config
            .from_chains
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| BlockchainError::UnknownChain("no source chain configured".to_string()))?;
        self.source = Some(source);
        Ok(())
    }

    pub async fn act(&self, ctx: &IdentityContext) -> BlockchainResult<()> {
        let source = self.source.ok_or(BlockchainError::NotInitialized("bridge source"))?;
        tracing::info!(from = %source, venue = self.router.name(), "Starting bridge");

        let amount = setup_amount(ctx, Token::NATIVE, None, source, Some(self.config.amount_range), false).await?;

        let request = BridgeQuoteRequest {
            src_chain_id: ctx.chains.get_numeric_id(source)?,
            dst_chain_id: ctx.chains.get_numeric_id(Chain::SETTLEMENT)?,
            amount,
            receiver: ctx.session.address(),
        };
        let mut intent = self.router.build_bridge(ctx.relay.http()?, &request).await?;

        let pipeline = TxPipeline::new(ctx, source)?;
        let base_fee = pipeline.rpc().latest_base_fee().await.unwrap_or_else(|e| {
            tracing::debug!(chain = %source, error = %e, "Base fee unavailable");
            None
        });
        let (max_fee, tip) = bridge_fees(base_fee);
        intent.max_fee_per_gas = Some(max_fee);
        intent.max_priority_fee_per_gas = Some(tip);

        let message = format!(
            "bridge {} eth from {} to {}",
            ctx.tokens.format_amount(Token::NATIVE, amount),
            source,
            Chain::SETTLEMENT
        );
        pipeline.send_transaction(&intent, &message).await?;

        poll_balance(ctx, Chain::SETTLEMENT, None, None).await;
        Ok(())
    }
}
