//! Static chain table and RPC client factory.
//!
//! # Responsibilities
//! - Map each supported [`Chain`] to its RPC endpoint, explorer and numeric id
//! - Resolve numeric chain ids back to a [`Chain`]
//! - Build per-call RPC handles bound to the identity's signer and relay

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use serde::{Deserialize, Serialize};

use crate::blockchain::client::{AlloyRpc, ChainRpc, RpcFactory};
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::WalletSession;
use crate::net::NetworkRelay;

/// Supported chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Zkevm,
    Zksync,
    Base,
    Linea,
}

impl Chain {
    /// All registered chains, in table order.
    pub const ALL: [Chain; 5] = [
        Chain::Ethereum,
        Chain::Zkevm,
        Chain::Zksync,
        Chain::Base,
        Chain::Linea,
    ];

    /// The chain the wallet session signs on and most balance logic runs on.
    pub const SETTLEMENT: Chain = Chain::Zkevm;

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Zkevm => "zkevm",
            Chain::Zksync => "zksync",
            Chain::Base => "base",
            Chain::Linea => "linea",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static information about one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainInfo {
    pub chain: Chain,
    pub rpc_url: String,
    pub explorer_url: String,
    pub numeric_id: u64,
}

fn default_table() -> Vec<ChainInfo> {
    let entry = |chain, rpc: &str, explorer: &str, numeric_id| ChainInfo {
        chain,
        rpc_url: rpc.to_string(),
        explorer_url: explorer.to_string(),
        numeric_id,
    };

    vec![
        entry(Chain::Ethereum, "https://ethereum.publicnode.com", "https://etherscan.io", 1),
        entry(
            Chain::Zkevm,
            "https://polygon-zkevm.blockpi.network/v1/rpc/public",
            "https://zkevm.polygonscan.com",
            1101,
        ),
        entry(Chain::Zksync, "https://rpc.ankr.com/zksync_era", "https://explorer.zksync.io", 324),
        entry(Chain::Base, "https://rpc.ankr.com/base", "https://basescan.org", 8453),
        entry(Chain::Linea, "https://1rpc.io/linea", "https://lineascan.build", 59144),
    ]
}

/// Immutable registry of supported chains.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainInfo>,
    rpc_timeout: Duration,
    proxy_rpc_requests: bool,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self {
            chains: default_table(),
            rpc_timeout: Duration::from_secs(30),
            proxy_rpc_requests: false,
        }
    }
}

impl ChainRegistry {
    /// Build the registry, replacing RPC endpoints named in `overrides`.
    pub fn new(
        overrides: &HashMap<Chain, String>,
        rpc_timeout: Duration,
        proxy_rpc_requests: bool,
    ) -> Self {
        let mut chains = default_table();
        for info in chains.iter_mut() {
            if let Some(url) = overrides.get(&info.chain) {
                info.rpc_url = url.clone();
            }
        }
        Self {
            chains,
            rpc_timeout,
            proxy_rpc_requests,
        }
    }

    fn info(&self, chain: Chain) -> BlockchainResult<&ChainInfo> {
        self.chains
            .iter()
            .find(|info| info.chain == chain)
            .ok_or_else(|| BlockchainError::UnknownChain(chain.to_string()))
    }

    pub fn chains(&self) -> &[ChainInfo] {
        &self.chains
    }

    pub fn get_explorer_url(&self, chain: Chain) -> BlockchainResult<&str> {
        Ok(self.info(chain)?.explorer_url.as_str())
    }

    pub fn get_numeric_id(&self, chain: Chain) -> BlockchainResult<u64> {
        Ok(self.info(chain)?.numeric_id)
    }

    pub fn get_rpc_url(&self, chain: Chain) -> BlockchainResult<&str> {
        Ok(self.info(chain)?.rpc_url.as_str())
    }

    /// Resolve a numeric chain id to its registered chain.
    pub fn resolve_chain_by_numeric_id(&self, numeric_id: u64) -> BlockchainResult<Chain> {
        self.chains
            .iter()
            .find(|info| info.numeric_id == numeric_id)
            .map(|info| info.chain)
            .ok_or_else(|| BlockchainError::UnknownChain(numeric_id.to_string()))
    }

    /// Explorer link for a transaction hash on the chain with `numeric_id`.
    pub fn explorer_link(&self, numeric_id: u64, hash: &str) -> BlockchainResult<String> {
        let chain = self.resolve_chain_by_numeric_id(numeric_id)?;
        let base = self.get_explorer_url(chain)?.trim_end_matches('/');
        Ok(format!("{}/tx/{}", base, hash))
    }

    /// The session's signer rebound to `chain`'s EIP-155 id.
    pub fn chain_signer(&self, chain: Chain, session: &WalletSession) -> BlockchainResult<PrivateKeySigner> {
        let info = self.info(chain)?;
        Ok(session.signer().clone().with_chain_id(Some(info.numeric_id)))
    }

    /// Create a fresh RPC handle for `chain`.
    ///
    /// Handles are cheap and must not be cached across proxy rotations: the
    /// relay's client is captured at creation time.
    pub fn get_rpc_client(
        &self,
        chain: Chain,
        session: &WalletSession,
        relay: &NetworkRelay,
    ) -> BlockchainResult<AlloyRpc> {
        let info = self.info(chain)?;
        let proxied = if self.proxy_rpc_requests {
            relay.rpc_transport()?
        } else {
            // Still gated: no transport before the relay is up.
            relay.http()?;
            None
        };
        let signer = self.chain_signer(chain, session)?;
        AlloyRpc::connect(info, signer, proxied, self.rpc_timeout)
    }
}

impl RpcFactory for ChainRegistry {
    fn connect(
        &self,
        chain: Chain,
        session: &WalletSession,
        relay: &NetworkRelay,
    ) -> BlockchainResult<Arc<dyn ChainRpc>> {
        Ok(Arc::new(self.get_rpc_client(chain, session, relay)?))
    }
}
