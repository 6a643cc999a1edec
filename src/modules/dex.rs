//! Swap module with optional liquidity provision.

use std::sync::Arc;

use alloy::primitives::U256;

use crate::blockchain::amount::setup_amount;
use crate::blockchain::tokens::{PairRequest, Token};
use crate::blockchain::transaction::TxPipeline;
use crate::blockchain::types::{BlockchainError, BlockchainResult, TransactionOutcome};
use crate::chains::Chain;
use crate::config::SwapConfig;
use crate::context::IdentityContext;
use crate::quoting::{SwapQuoteRequest, SwapRouter};

/// Rewrite a pair so the native asset is the sold side.
///
/// When neither side is native the bought side is kept and native is sold
/// for it.
pub fn normalize_pair((from, to): (Token, Token)) -> (Token, Token) {
    let other = if to.is_native() { from } else { to };
    (Token::NATIVE, other)
}

pub struct SwapModule {
    config: SwapConfig,
    router: Arc<dyn SwapRouter>,
    pair: Option<(Token, Token)>,
}

impl SwapModule {
    pub fn new(config: SwapConfig, router: Arc<dyn SwapRouter>) -> Self {
        Self {
            config,
            router,
            pair: None,
        }
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn pair(&self) -> Option<(Token, Token)> {
        self.pair
    }

    fn pair_request(&self, ctx: &IdentityContext) -> PairRequest {
        PairRequest {
            excluded: self.config.excluded_tokens.clone(),
            fallback: ctx.config.pair_fallback,
            ..PairRequest::default()
        }
    }

    /// Pick the pair this run trades.
    pub async fn setup(&mut self, ctx: &IdentityContext) -> BlockchainResult<()> {
        let rpc = ctx.rpc(Chain::SETTLEMENT)?;
        let pair = ctx
            .tokens
            .pick_random_pair(rpc.as_ref(), ctx.session.address(), &self.pair_request(ctx))
            .await?;
        tracing::info!(from = %pair.0, to = %pair.1, "Selected pair");
        self.pair = Some(pair);
        Ok(())
    }

    pub async fn act(&self, ctx: &IdentityContext) -> BlockchainResult<()> {
        let (from, to) = self.pair.ok_or(BlockchainError::NotInitialized("swap pair"))?;
        self.swap(ctx, from, to).await?;
        Ok(())
    }

    async fn swap(&self, ctx: &IdentityContext, from: Token, to: Token) -> BlockchainResult<TransactionOutcome> {
        tracing::info!(venue = self.router.name(), "Starting swap");
        let amount = setup_amount(
            ctx,
            from,
            Some(self.router.spender()),
            Chain::SETTLEMENT,
            self.config.amount_range,
            false,
        )
        .await?;

        let request = self.quote_request(ctx, from, to, amount);
        let pipeline = TxPipeline::new(ctx, Chain::SETTLEMENT)?;
        pipeline.wait_for_gas().await?;
        let intent = self.router.build_swap(ctx.relay.http()?, &request).await?;

        let message = format!(
            "swap on {} {} {} ==> {}",
            self.router.name(),
            ctx.tokens.format_amount(from, amount),
            from,
            to
        );
        pipeline.send_transaction(&intent, &message).await
    }

    fn quote_request(&self, ctx: &IdentityContext, from: Token, to: Token, amount: U256) -> SwapQuoteRequest {
        SwapQuoteRequest {
            src_token: ctx.tokens.get_address(from),
            dst_token: ctx.tokens.get_address(to),
            src_decimals: ctx.tokens.get_decimals(from),
            dst_decimals: ctx.tokens.get_decimals(to),
            amount,
            user: ctx.session.address(),
        }
    }

    /// Settle on a (native, token) pair the wallet holds both sides of.
    async fn liquidity_pair(&mut self, ctx: &IdentityContext) -> BlockchainResult<(Token, Token)> {
        let current = self.pair.ok_or(BlockchainError::NotInitialized("swap pair"))?;
        let (from, mut to) = normalize_pair(current);

        let rpc = ctx.rpc(Chain::SETTLEMENT)?;
        let owner = ctx.session.address();
        let balance = ctx.tokens.get_balance(rpc.as_ref(), to, owner).await?;

        if balance.is_zero() {
            let mut request = self.pair_request(ctx);
            request.forced_first = Some(Token::NATIVE);
            request.only_nonzero_balance = true;

            match ctx.tokens.pick_random_pair(rpc.as_ref(), owner, &request).await {
                Ok((_, held)) => to = held,
                Err(BlockchainError::InsufficientTokenUniverse { .. }) => {
                    request.only_nonzero_balance = false;
                    let (_, target) = ctx.tokens.pick_random_pair(rpc.as_ref(), owner, &request).await?;
                    to = target;
                    tracing::info!(token = %to, "No token held for liquidity, swapping first");
                    self.swap(ctx, from, to).await?;
                }
                Err(e) => return Err(e),
            }
        }

        self.pair = Some((from, to));
        Ok((from, to))
    }

    pub async fn add_liquidity(&mut self, ctx: &IdentityContext) -> BlockchainResult<()> {
        let (from, to) = self.liquidity_pair(ctx).await?;

        let spender = self.router.spender();
        setup_amount(ctx, to, Some(spender), Chain::SETTLEMENT, None, true).await?;
        let amount = setup_amount(ctx, from, None, Chain::SETTLEMENT, self.config.amount_range, false).await?;

        let request = self.quote_request(ctx, from, to, amount);
        let Some(intent) = self.router.build_add_liquidity(ctx.relay.http()?, &request).await? else {
            tracing::info!(venue = self.router.name(), "Venue offers no liquidity provision, skipping");
            return Ok(());
        };

        let message = format!(
            "add liquidity on {} {} {} === {}",
            self.router.name(),
            ctx.tokens.format_amount(from, amount),
            from,
            to
        );
        TxPipeline::new(ctx, Chain::SETTLEMENT)?
            .send_transaction(&intent, &message)
            .await?;
        Ok(())
    }
}
