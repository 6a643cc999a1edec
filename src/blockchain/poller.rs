//! Balance convergence polling.
//!
//! Used after cross-chain actions: block until the destination balance
//! grows. There is no timeout and no cancellation.

use std::time::Duration;

use alloy::primitives::U256;

use crate::blockchain::tokens::{format_units, Token};
use crate::blockchain::types::BlockchainResult;
use crate::chains::Chain;
use crate::context::IdentityContext;
use crate::observability::metrics;

/// Wait until the balance of `token` (native when `None`) on `chain`
/// strictly exceeds its starting value.
///
/// Read errors are logged and end the poll without an increase.
pub async fn poll_balance(ctx: &IdentityContext, chain: Chain, token: Option<Token>, decimals: Option<u8>) {
    tracing::info!(chain = %chain, "Polling balance");
    match poll_until_increase(ctx, chain, token, decimals).await {
        Ok(balance) => {
            tracing::info!(chain = %chain, balance = %balance, "Balance arrived");
            metrics::record_balance_poll(chain.as_str(), "arrived");
        }
        Err(e) => {
            tracing::error!(chain = %chain, error = %e, "Balance poll aborted");
            metrics::record_balance_poll(chain.as_str(), "aborted");
        }
    }
}

async fn poll_until_increase(
    ctx: &IdentityContext,
    chain: Chain,
    token: Option<Token>,
    decimals: Option<u8>,
) -> BlockchainResult<String> {
    let rpc = ctx.rpc(chain)?;
    let owner = ctx.session.address();
    let token = token.unwrap_or(Token::NATIVE);
    let decimals = decimals.unwrap_or_else(|| ctx.tokens.get_decimals(token));
    let interval = Duration::from_secs(ctx.config.poller.interval_secs);

    let start: U256 = ctx.tokens.get_balance(rpc.as_ref(), token, owner).await?;
    loop {
        let balance = ctx.tokens.get_balance(rpc.as_ref(), token, owner).await?;
        let formatted = format_units(balance, decimals);
        tracing::info!(chain = %chain, token = %token, balance = %formatted, "Balance observed");
        if balance > start {
            return Ok(formatted);
        }
        tracing::debug!(secs = interval.as_secs(), "Retrying balance poll");
        tokio::time::sleep(interval).await;
    }
}
