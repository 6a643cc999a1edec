//! Submission and confirmation pipeline.
//!
//! # Responsibilities
//! - Gate submissions on the configured gas-price ceiling
//! - Estimate gas with a fixed buffer and a floor fee
//! - Race confirmation against a timeout and classify the outcome
//! - Reconcile an ambiguous (timed out) submission before any retry
//!
//! ```text
//! Submitted → { Confirmed | Failed | TimedOut }
//! ```
//!
//! No retries happen here.

use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::TxHash;

use crate::blockchain::client::ChainRpc;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, GasEstimate, ReceiptInfo, SubmittedTransaction, TransactionIntent,
    TransactionOutcome, TxStatus,
};
use crate::chains::Chain;
use crate::context::IdentityContext;
use crate::observability::metrics;
use crate::resilience::cooldown;

const GWEI: u128 = 1_000_000_000;

/// Pipeline bound to one identity and one chain.
pub struct TxPipeline<'a> {
    ctx: &'a IdentityContext,
    chain: Chain,
    rpc: Arc<dyn ChainRpc>,
}

impl<'a> TxPipeline<'a> {
    pub fn new(ctx: &'a IdentityContext, chain: Chain) -> BlockchainResult<Self> {
        let rpc = ctx.rpc(chain)?;
        Ok(Self { ctx, chain, rpc })
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn rpc(&self) -> &dyn ChainRpc {
        self.rpc.as_ref()
    }

    /// Gas limit (estimate plus buffer) and gas price (floor when unknown).
    pub async fn estimate_gas(&self, intent: &TransactionIntent) -> BlockchainResult<GasEstimate> {
        let gas = &self.ctx.config.gas;
        let floor = u128::from(gas.floor_gwei) * GWEI;

        let gas_price = match self.rpc.gas_price().await {
            Ok(price) if price > 0 => price,
            Ok(_) => floor,
            Err(e) => {
                tracing::debug!(chain = %self.chain, error = %e, "Fee data unavailable, using floor");
                floor
            }
        };

        let request = intent.to_request(self.ctx.session.address(), self.rpc.numeric_id());
        let estimated = self
            .rpc
            .estimate_gas(request)
            .await
            .map_err(|e| BlockchainError::GasEstimationFailed(e.to_string()))?;

        Ok(GasEstimate {
            gas_limit: estimated.saturating_add(gas.limit_buffer),
            gas_price,
        })
    }

    /// Block until the gate chain's gas price is under the ceiling.
    pub async fn wait_for_gas(&self) -> BlockchainResult<()> {
        let Some(max_gwei) = self.ctx.config.gas.max_gwei else {
            return Ok(());
        };
        let ceiling = u128::from(max_gwei) * GWEI;
        let gate_chain = self.ctx.config.gas.gate_chain;
        let rpc = self.ctx.rpc(gate_chain)?;
        let poll = Duration::from_secs(self.ctx.config.gas.gate_poll_secs);

        loop {
            let price = rpc.gas_price().await?;
            if price <= ceiling {
                return Ok(());
            }
            tracing::info!(
                chain = %gate_chain,
                gwei = price / GWEI,
                max_gwei,
                "Gas price above ceiling, waiting"
            );
            tokio::time::sleep(poll).await;
        }
    }

    /// Sign and broadcast `intent`. Gas is estimated unless the intent fixes it.
    pub async fn submit(&self, intent: &TransactionIntent) -> BlockchainResult<SubmittedTransaction> {
        let chain_id = self.rpc.numeric_id();
        let mut request = intent.to_request(self.ctx.session.address(), chain_id);

        let gas_limit = match intent.gas_limit {
            Some(limit) => limit,
            None => {
                let estimate = self.estimate_gas(intent).await?;
                if intent.max_fee_per_gas.is_none() {
                    request = request.with_gas_price(estimate.gas_price);
                }
                estimate.gas_limit
            }
        };
        request = request.with_gas_limit(gas_limit);

        if let Some(max_fee) = intent.max_fee_per_gas {
            request = request.with_max_fee_per_gas(max_fee);
            if let Some(tip) = intent.max_priority_fee_per_gas {
                request = request.with_max_priority_fee_per_gas(tip);
            }
        }

        let hash = self.rpc.send_transaction(request).await?;
        tracing::info!(chain = %self.chain, hash = %hash, gas_limit, "Transaction submitted");
        Ok(SubmittedTransaction { hash, chain_id })
    }

    /// Gate, estimate, submit, confirm, then cool down.
    pub async fn send_transaction(
        &self,
        intent: &TransactionIntent,
        message: &str,
    ) -> BlockchainResult<TransactionOutcome> {
        self.wait_for_gas().await?;
        let submitted = self.submit(intent).await?;
        let outcome = self.confirm(&submitted, message).await?;
        cooldown(&self.ctx.config.delays.tx_cooldown, "post-transaction cooldown").await;
        Ok(outcome)
    }

    /// [`Self::get_transaction_state`] with the configured defaults.
    pub async fn confirm(
        &self,
        submitted: &SubmittedTransaction,
        message: &str,
    ) -> BlockchainResult<TransactionOutcome> {
        let c = &self.ctx.config.confirmation;
        self.get_transaction_state(submitted, message, c.confirmations, c.timeout_secs)
            .await
    }

    /// Race `confirmations` against `timeout_secs` and classify the receipt.
    ///
    /// Whichever branch settles first wins and the other is dropped.
    pub async fn get_transaction_state(
        &self,
        submitted: &SubmittedTransaction,
        message: &str,
        confirmations: u64,
        timeout_secs: u64,
    ) -> BlockchainResult<TransactionOutcome> {
        let poll = self.ctx.config.confirmation.poll_interval();

        let settled = tokio::select! {
            receipt = wait_for_confirmations(self.rpc.as_ref(), submitted.hash, confirmations, poll) => Some(receipt?),
            _ = tokio::time::sleep(Duration::from_secs(timeout_secs)) => None,
        };

        let hash_str = submitted.hash.to_string();
        let link = self.ctx.chains.explorer_link(submitted.chain_id, &hash_str)?;

        let Some(receipt) = settled else {
            tracing::warn!(message, link = %link, timeout_secs, "Transaction not confirmed in time");
            metrics::record_tx_outcome(TxStatus::TimedOut.as_str());
            return Err(BlockchainError::TransactionTimedOut {
                hash: submitted.hash,
                chain_id: submitted.chain_id,
                timeout_secs,
            });
        };

        match receipt.status {
            1 => {
                tracing::info!(link = %link, "Transaction {}", message.to_uppercase());
                self.ctx.record.append(self.ctx.session.name()).await;
                metrics::record_tx_outcome(TxStatus::Confirmed.as_str());
                Ok(TransactionOutcome {
                    hash: submitted.hash,
                    status: TxStatus::Confirmed,
                    explorer_link: link,
                })
            }
            0 => {
                tracing::error!(message, link = %link, "Transaction failed");
                metrics::record_tx_outcome(TxStatus::Failed.as_str());
                Err(BlockchainError::TransactionFailed {
                    hash: submitted.hash,
                    explorer_link: link,
                })
            }
            other => Err(BlockchainError::UnknownTransactionStatus(other)),
        }
    }

    /// On-chain state of a submission whose confirmation wait timed out.
    ///
    /// Must be called before re-submitting anything that timed out.
    pub async fn reconcile(&self, hash: TxHash) -> BlockchainResult<TxStatus> {
        let status = match self.rpc.get_receipt(hash).await? {
            None => TxStatus::Pending,
            Some(ReceiptInfo { status: 1, .. }) => TxStatus::Confirmed,
            Some(ReceiptInfo { status: 0, .. }) => TxStatus::Failed,
            Some(ReceiptInfo { status, .. }) => return Err(BlockchainError::UnknownTransactionStatus(status)),
        };
        tracing::info!(chain = %self.chain, hash = %hash, status = status.as_str(), "Reconciled transaction");
        if status == TxStatus::Confirmed {
            self.ctx.record.append(self.ctx.session.name()).await;
        }
        Ok(status)
    }
}

/// Poll until `hash` is mined and buried under `confirmations - 1` blocks.
async fn wait_for_confirmations(
    rpc: &dyn ChainRpc,
    hash: TxHash,
    confirmations: u64,
    poll: Duration,
) -> BlockchainResult<ReceiptInfo> {
    loop {
        if let Some(receipt) = rpc.get_receipt(hash).await? {
            if let Some(mined_at) = receipt.block_number {
                let head = rpc.block_number().await?;
                if head.saturating_sub(mined_at) + 1 >= confirmations.max(1) {
                    return Ok(receipt);
                }
            }
        }
        tokio::time::sleep(poll).await;
    }
}
