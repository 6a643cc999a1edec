//! Per-identity execution context.
//!
//! Everything one identity's run touches is reachable from an
//! [`IdentityContext`]. A new context is built for each identity and
//! dropped when its modules finish, so nothing leaks into the next one.

use std::sync::Arc;

use crate::blockchain::client::{ChainRpc, RpcFactory};
use crate::blockchain::tokens::TokenRegistry;
use crate::blockchain::types::BlockchainResult;
use crate::blockchain::wallet::WalletSession;
use crate::chains::{Chain, ChainRegistry};
use crate::config::AppConfig;
use crate::net::NetworkRelay;
use crate::record::ProcessedRecord;

/// Process-wide, read-only services shared by every identity.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub chains: Arc<ChainRegistry>,
    pub tokens: Arc<TokenRegistry>,
    pub rpc: Arc<dyn RpcFactory>,
    pub record: ProcessedRecord,
}

impl Services {
    /// Services backed by real JSON-RPC endpoints.
    pub fn from_config(config: AppConfig) -> Self {
        let chains = Arc::new(ChainRegistry::new(
            &config.chains,
            std::time::Duration::from_secs(config.rpc.timeout_secs),
            config.proxy.rpc_requests,
        ));
        let record = ProcessedRecord::new(&config.processed_record_path);
        Self {
            config: Arc::new(config),
            rpc: chains.clone(),
            chains,
            tokens: Arc::new(TokenRegistry::default()),
            record,
        }
    }
}

/// State owned by one identity for the length of its run.
pub struct IdentityContext {
    pub config: Arc<AppConfig>,
    pub chains: Arc<ChainRegistry>,
    pub tokens: Arc<TokenRegistry>,
    pub record: ProcessedRecord,
    pub session: WalletSession,
    pub relay: NetworkRelay,
    rpc_factory: Arc<dyn RpcFactory>,
}

impl IdentityContext {
    pub fn new(services: &Services, session: WalletSession, relay: NetworkRelay) -> Self {
        Self {
            config: services.config.clone(),
            chains: services.chains.clone(),
            tokens: services.tokens.clone(),
            record: services.record.clone(),
            session,
            relay,
            rpc_factory: services.rpc.clone(),
        }
    }

    /// Fresh RPC handle for `chain`, bound to this identity's signer and relay.
    pub fn rpc(&self, chain: Chain) -> BlockchainResult<Arc<dyn ChainRpc>> {
        self.rpc_factory.connect(chain, &self.session, &self.relay)
    }

    pub fn name(&self) -> &str {
        self.session.name()
    }
}

impl std::fmt::Debug for IdentityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityContext")
            .field("name", &self.session.name())
            .field("address", &self.session.address())
            .field("relay", &self.relay.is_initialized())
            .finish()
    }
}
