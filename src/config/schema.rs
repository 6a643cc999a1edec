//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::blockchain::tokens::{AmountRange, PairFallback, Token};
use crate::chains::Chain;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Refuse to sweep the native balance when no amount range is known.
    pub prevent_sending_max_ether: bool,

    /// Order in which enabled modules run for each identity.
    pub order: ModuleOrder,

    /// Identity names never processed.
    pub excluded_wallets: BTreeSet<String>,

    /// Append-only record of identities with a confirmed transaction.
    pub processed_record_path: String,

    /// Pair selection policy when no balance-holding token survives exclusion.
    pub pair_fallback: PairFallback,

    /// Randomized waits between steps.
    pub delays: DelayConfig,

    /// Proxy enforcement and probing.
    pub proxy: ProxySettings,

    /// Gas estimation and gas-price gate.
    pub gas: GasConfig,

    /// Confirmation race settings.
    pub confirmation: ConfirmationConfig,

    /// Balance convergence polling.
    pub poller: PollerConfig,

    /// RPC client settings.
    pub rpc: RpcConfig,

    /// RPC URL overrides per chain.
    pub chains: HashMap<Chain, String>,

    /// Proxy assignment by identity name.
    pub proxies: HashMap<String, ProxyHandle>,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Module definitions, in default order.
    pub modules: Vec<ModuleConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            prevent_sending_max_ether: true,
            order: ModuleOrder::Random,
            excluded_wallets: BTreeSet::new(),
            processed_record_path: "resources/excludedWallets.txt".to_string(),
            pair_fallback: PairFallback::WidenToAll,
            delays: DelayConfig::default(),
            proxy: ProxySettings::default(),
            gas: GasConfig::default(),
            confirmation: ConfirmationConfig::default(),
            poller: PollerConfig::default(),
            rpc: RpcConfig::default(),
            chains: HashMap::new(),
            proxies: HashMap::new(),
            observability: ObservabilityConfig::default(),
            modules: Vec::new(),
        }
    }
}

/// Module run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleOrder {
    /// Configured order.
    Default,
    /// All enabled modules, shuffled.
    Random,
    /// One randomly chosen enabled module.
    OneRandom,
}

/// Inclusive range of seconds for a randomized wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DelayRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DelayRange {
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    pub const ZERO: DelayRange = DelayRange::new(0, 0);
}

/// Randomized waits between steps.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Between two identities.
    pub wallet: DelayRange,
    /// Between two modules of the same identity.
    pub module: DelayRange,
    /// After every confirmed submission.
    pub tx_cooldown: DelayRange,
    /// Before a module's secondary act.
    pub secondary_act: DelayRange,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            wallet: DelayRange::new(5 * 60, 15 * 60),
            module: DelayRange::new(3 * 60, 7 * 60),
            tx_cooldown: DelayRange::new(45, 90),
            secondary_act: DelayRange::new(60, 120),
        }
    }
}

/// Proxy enforcement settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Require a working, anonymizing proxy for every identity.
    pub enforce: bool,

    /// Route chain RPC traffic through the proxy as well.
    pub rpc_requests: bool,

    /// Endpoint answering `{"ip": "..."}`.
    pub ip_echo_url: String,

    /// Timeout for relay HTTP calls in seconds.
    pub timeout_secs: u64,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            enforce: true,
            rpc_requests: true,
            ip_echo_url: "https://api64.ipify.org?format=json".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Per-identity proxy endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProxyHandle {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyHandle {
    /// Proxy URL without credentials.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish()
    }
}

/// Gas estimation and price gate.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GasConfig {
    /// Block submissions until the gate chain's gas price is at or below
    /// this many gwei. `None` disables the gate.
    pub max_gwei: Option<u64>,

    /// Chain whose gas price the gate watches.
    pub gate_chain: Chain,

    /// Seconds between gate re-polls.
    pub gate_poll_secs: u64,

    /// Gas price used when the node reports none, in gwei.
    pub floor_gwei: u64,

    /// Added to every gas estimate.
    pub limit_buffer: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            max_gwei: Some(18),
            gate_chain: Chain::Ethereum,
            gate_poll_secs: 60,
            floor_gwei: 1,
            limit_buffer: 10_000,
        }
    }
}

/// Confirmation race settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub confirmations: u64,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            confirmations: 1,
            timeout_secs: 240,
            poll_interval_ms: 2000,
        }
    }
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Balance convergence polling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { interval_secs: 180 }
    }
}

/// RPC client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// One configured module.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleConfig {
    Swap(SwapConfig),
    Bridge(BridgeConfig),
    Wrap(WrapConfig),
}

impl ModuleConfig {
    pub fn enabled(&self) -> bool {
        match self {
            ModuleConfig::Swap(c) => c.enabled,
            ModuleConfig::Bridge(c) => c.enabled,
            ModuleConfig::Wrap(c) => c.enabled,
        }
    }
}

/// Swap route provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapVenue {
    /// QuickSwap on zkEVM via the Paraswap API.
    Quickswap,
}

/// Bridge route provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeVenue {
    XyFinance,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwapConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub venue: SwapVenue,
    /// Tokens never picked for a pair.
    #[serde(default)]
    pub excluded_tokens: BTreeSet<Token>,
    /// Run add-liquidity after the swap.
    #[serde(default)]
    pub add_liquidity: bool,
    /// Overrides the token's default amount range.
    #[serde(default)]
    pub amount_range: Option<AmountRange>,
    /// Quote API base URL override.
    #[serde(default)]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub venue: BridgeVenue,
    /// Candidate source chains; one is drawn per run.
    pub from_chains: Vec<Chain>,
    /// Native amount to deposit.
    pub amount_range: AmountRange,
    /// Quote API base URL override.
    #[serde(default)]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WrapConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_wrap_chain")]
    pub chain: Chain,
    #[serde(default = "default_weth")]
    pub weth_address: Address,
}

fn default_enabled() -> bool {
    true
}

fn default_wrap_chain() -> Chain {
    Chain::Base
}

fn default_weth() -> Address {
    address!("4200000000000000000000000000000000000006")
}
