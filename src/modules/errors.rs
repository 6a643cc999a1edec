//! Classification of module failures into retry, skip, or fatal.

use crate::blockchain::poller::poll_balance;
use crate::blockchain::transaction::TxPipeline;
use crate::blockchain::types::{BlockchainError, BlockchainResult, TxStatus};
use crate::chains::Chain;
use crate::context::IdentityContext;

/// What the driver should do after a module error that was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Funds were awaited; running the module again is reasonable.
    Retry,
    /// Move on to the next module.
    Skip,
}

/// Text patterns that mean the wallet lacks funds.
fn signals_insufficient_funds(text: &str) -> bool {
    text.contains("insufficient") || text.contains("not enough native")
}

/// Text patterns that mean the venue has no pool for the pair.
fn signals_missing_pool(text: &str) -> bool {
    text.contains("no pool")
}

/// Decide what to do with `err` raised by `operation`.
///
/// Node-reported funding errors wait for the native balance on `chain` to
/// grow and return [`ErrorDisposition::Retry`]. A drawn amount above the
/// token balance is a configuration error and is handed back. Missing pools return
/// [`ErrorDisposition::Skip`]. A timed-out transaction is reconciled
/// on-chain first. Anything else is handed back as `Err`.
pub async fn handle_module_error(
    ctx: &IdentityContext,
    err: BlockchainError,
    operation: &str,
    chain: Chain,
) -> BlockchainResult<ErrorDisposition> {
    tracing::error!(operation, error = %err, "Module error");

    if let BlockchainError::TransactionTimedOut { hash, chain_id, .. } = &err {
        let tx_chain = ctx.chains.resolve_chain_by_numeric_id(*chain_id)?;
        let status = TxPipeline::new(ctx, tx_chain)?.reconcile(*hash).await?;
        return Ok(match status {
            TxStatus::Failed => ErrorDisposition::Retry,
            TxStatus::Pending => {
                tracing::warn!(hash = %hash, "Transaction still pending, not resubmitting");
                ErrorDisposition::Skip
            }
            TxStatus::Confirmed | TxStatus::TimedOut => ErrorDisposition::Skip,
        });
    }

    let text = err.to_string().to_lowercase();
    if signals_insufficient_funds(&text) {
        poll_balance(ctx, chain, None, None).await;
        return Ok(ErrorDisposition::Retry);
    }
    if signals_missing_pool(&text) {
        return Ok(ErrorDisposition::Skip);
    }

    Err(err)
}
