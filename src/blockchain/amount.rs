//! Amount selection and spender approval.
//!
//! # Responsibilities
//! - Draw the amount to transact (range, default range, or balance minus buffer)
//! - Refuse amounts above the wallet's token balance
//! - Make sure the spender's allowance covers the amount before returning

use alloy::primitives::{Address, U256};
use rand::Rng;

use crate::blockchain::erc20;
use crate::blockchain::tokens::{AmountRange, Token};
use crate::blockchain::transaction::TxPipeline;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::chains::Chain;
use crate::context::IdentityContext;
use crate::observability::metrics;

/// Resolution of drawn amounts, in decimal places.
const AMOUNT_PRECISION: u32 = 4;

/// Share of the native balance kept back when sweeping, in percent.
const NATIVE_BUFFER_PERCENT: u64 = 30;

/// Draw a uniform amount with four-decimal resolution and scale it to
/// `decimals` raw units.
///
/// Range bounds are taken as four-decimal values. Tokens with fewer decimals
/// draw whole raw units inside the range.
pub fn draw_amount<R: Rng + ?Sized>(range: &AmountRange, decimals: u8, rng: &mut R) -> BlockchainResult<U256> {
    let scale = 10f64.powi(AMOUNT_PRECISION as i32);
    let low = (range.min * scale).round();
    let high = (range.max * scale).round();

    if !low.is_finite() || !high.is_finite() || low < 0.0 || low > high {
        return Err(empty_range(range, AMOUNT_PRECISION));
    }
    let (low, high) = (low as u64, high as u64);

    let decimals = u32::from(decimals);
    if decimals >= AMOUNT_PRECISION {
        let units = rng.gen_range(low..=high);
        return Ok(U256::from(units) * U256::from(10u64).pow(U256::from(decimals - AMOUNT_PRECISION)));
    }

    let step = 10u64.pow(AMOUNT_PRECISION - decimals);
    let (low, high) = (low.div_ceil(step), high / step);
    if low > high {
        return Err(empty_range(range, decimals));
    }
    Ok(U256::from(rng.gen_range(low..=high)))
}

fn empty_range(range: &AmountRange, decimals: u32) -> BlockchainError {
    BlockchainError::InvalidAmount(format!(
        "range [{}, {}] holds no value at {} decimals",
        range.min, range.max, decimals
    ))
}

/// Decide how much of `token` to transact on `chain`.
///
/// When `spender` is given and the token is not native, an approval for
/// exactly the amount is submitted and confirmed first if the current
/// allowance is short.
pub async fn setup_amount(
    ctx: &IdentityContext,
    token: Token,
    spender: Option<Address>,
    chain: Chain,
    explicit_range: Option<AmountRange>,
    use_max_available: bool,
) -> BlockchainResult<U256> {
    let decimals = ctx.tokens.get_decimals(token);
    let range = explicit_range.or_else(|| ctx.tokens.default_range(token));
    let target = match range {
        Some(r) => Some(draw_amount(&r, decimals, &mut rand::thread_rng())?),
        None => None,
    };

    let owner = ctx.session.address();
    let rpc = ctx.rpc(chain)?;

    if token.is_native() {
        if let Some(amount) = target {
            return Ok(amount);
        }
        if ctx.config.prevent_sending_max_ether {
            return Err(BlockchainError::NoValidAmount(token.to_string()));
        }
        tracing::warn!(chain = %chain, "Sending most of the native balance");
        let balance = rpc.get_balance(owner).await?;
        let buffer = balance * U256::from(NATIVE_BUFFER_PERCENT) / U256::from(100u64);
        return Ok(balance - buffer);
    }

    let contract = ctx.tokens.get_address(token);
    let balance = erc20::balance_of(rpc.as_ref(), contract, owner).await?;

    let amount = match target {
        Some(requested) if !use_max_available => {
            if requested > balance {
                return Err(BlockchainError::AmountExceedsBalance { requested, balance });
            }
            requested
        }
        _ => balance,
    };

    if let Some(spender) = spender {
        let current = erc20::allowance(rpc.as_ref(), contract, owner, spender).await?;
        if amount > current {
            tracing::info!(token = %token, spender = %spender, "Approving token");
            let pipeline = TxPipeline::new(ctx, chain)?;
            let submitted = pipeline.submit(&erc20::approve_intent(contract, spender, amount)).await?;
            pipeline
                .confirm(&submitted, &format!("approve {}", token.symbol()))
                .await?;
            metrics::record_approval(token.symbol());
        }
    }

    tracing::debug!(token = %token, amount = %ctx.tokens.format_amount(token, amount), "Amount set up");
    Ok(amount)
}
