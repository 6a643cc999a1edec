//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Abstract the chain operations the engine needs behind [`ChainRpc`]
//! - Connect to JSON-RPC endpoints, optionally through the relay's proxied client
//! - Bound every call with a timeout and map failures to [`BlockchainError`]

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use alloy::eips::BlockNumberOrTag;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::Http;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ReceiptInfo};
use crate::blockchain::wallet::WalletSession;
use crate::chains::{Chain, ChainInfo};
use crate::net::NetworkRelay;

/// Chain operations used by the engine.
///
/// Implementations are stateless handles; callers may create one per call.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Numeric chain id this handle talks to.
    fn numeric_id(&self) -> u64;

    /// Native balance of `owner`.
    async fn get_balance(&self, owner: Address) -> BlockchainResult<U256>;

    /// Read-only `eth_call`.
    async fn call(&self, to: Address, input: Bytes) -> BlockchainResult<Bytes>;

    async fn estimate_gas(&self, request: TransactionRequest) -> BlockchainResult<u64>;

    async fn gas_price(&self) -> BlockchainResult<u128>;

    /// Base fee of the latest block, if the chain reports one.
    async fn latest_base_fee(&self) -> BlockchainResult<Option<u128>>;

    /// Sign with the session key and broadcast.
    async fn send_transaction(&self, request: TransactionRequest) -> BlockchainResult<TxHash>;

    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<ReceiptInfo>>;

    async fn block_number(&self) -> BlockchainResult<u64>;
}

/// Builds RPC handles for a chain within one identity's context.
pub trait RpcFactory: Send + Sync {
    fn connect(
        &self,
        chain: Chain,
        session: &WalletSession,
        relay: &NetworkRelay,
    ) -> BlockchainResult<Arc<dyn ChainRpc>>;
}

/// Alloy-backed RPC handle with a signing wallet attached.
#[derive(Clone)]
pub struct AlloyRpc {
    provider: DynProvider,
    chain: Chain,
    numeric_id: u64,
    timeout_duration: Duration,
}

impl AlloyRpc {
    /// Connect to the chain described by `info`.
    ///
    /// When `proxied` carries a client, JSON-RPC traffic goes through it.
    pub fn connect(
        info: &ChainInfo,
        signer: PrivateKeySigner,
        proxied: Option<reqwest::Client>,
        timeout_duration: Duration,
    ) -> BlockchainResult<Self> {
        let url: url::Url = info.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", info.rpc_url, e))
        })?;
        let wallet = EthereumWallet::from(signer);

        let provider = match proxied {
            Some(client) => {
                let transport = Http::with_client(client, url);
                let rpc_client = RpcClient::new(transport, false);
                ProviderBuilder::new()
                    .wallet(wallet)
                    .connect_client(rpc_client)
                    .erased()
            }
            None => ProviderBuilder::new().wallet(wallet).connect_http(url).erased(),
        };

        Ok(Self {
            provider,
            chain: info.chain,
            numeric_id: info.numeric_id,
            timeout_duration,
        })
    }

    async fn bounded<T, E, F>(&self, what: &str, fut: F) -> BlockchainResult<T>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(chain = %self.chain, call = what, error = %e, "RPC error");
                Err(BlockchainError::Rpc(format!("{}: {}", what, e)))
            }
            Err(_) => {
                tracing::warn!(chain = %self.chain, call = what, "RPC timeout");
                Err(BlockchainError::Timeout(self.timeout_duration.as_secs()))
            }
        }
    }
}

#[async_trait]
impl ChainRpc for AlloyRpc {
    fn numeric_id(&self) -> u64 {
        self.numeric_id
    }

    async fn get_balance(&self, owner: Address) -> BlockchainResult<U256> {
        self.bounded("get_balance", self.provider.get_balance(owner).into_future())
            .await
    }

    async fn call(&self, to: Address, input: Bytes) -> BlockchainResult<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(input);
        self.bounded("eth_call", self.provider.call(request).into_future())
            .await
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> BlockchainResult<u64> {
        self.bounded("estimate_gas", self.provider.estimate_gas(request).into_future())
            .await
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.bounded("gas_price", self.provider.get_gas_price()).await
    }

    async fn latest_base_fee(&self) -> BlockchainResult<Option<u128>> {
        let block = self
            .bounded(
                "get_block",
                self.provider
                    .get_block_by_number(BlockNumberOrTag::Latest)
                    .into_future(),
            )
            .await?;
        Ok(block.and_then(|b| b.header.base_fee_per_gas).map(u128::from))
    }

    async fn send_transaction(&self, request: TransactionRequest) -> BlockchainResult<TxHash> {
        let pending = self
            .bounded("send_transaction", self.provider.send_transaction(request))
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<ReceiptInfo>> {
        let receipt = self
            .bounded("get_receipt", self.provider.get_transaction_receipt(hash))
            .await?;
        Ok(receipt.map(|r| ReceiptInfo {
            hash,
            block_number: r.block_number,
            status: u64::from(r.status()),
        }))
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.bounded("block_number", self.provider.get_block_number())
            .await
    }
}

impl std::fmt::Debug for AlloyRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyRpc")
            .field("chain", &self.chain)
            .field("numeric_id", &self.numeric_id)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
