//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tx_conductor::blockchain::client::{ChainRpc, RpcFactory};
use tx_conductor::blockchain::tokens::TokenRegistry;
use tx_conductor::blockchain::types::{BlockchainError, BlockchainResult, ReceiptInfo};
use tx_conductor::blockchain::wallet::WalletSession;
use tx_conductor::chains::{Chain, ChainRegistry};
use tx_conductor::config::{AppConfig, DelayRange};
use tx_conductor::context::{IdentityContext, Services};
use tx_conductor::net::NetworkRelay;
use tx_conductor::record::ProcessedRecord;

/// Anvil account #0.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const ZKEVM_ID: u64 = 1101;

pub const BASE_ID: u64 = 8453;

pub fn ether(milli: u64) -> U256 {
    U256::from(milli) * U256::from(1_000_000_000_000_000u64)
}

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// When the mock mines submitted transactions.
#[derive(Debug, Clone, Copy)]
pub enum Mining {
    After(Duration),
    Never,
}

/// Scriptable in-memory chain.
pub struct MockRpc {
    /// Id reported when used directly; [`MockFactory`] handles report their chain's id.
    pub numeric_id: u64,
    /// Native balance per read; the last value repeats.
    pub native: Mutex<VecDeque<U256>>,
    pub token_balances: Mutex<HashMap<Address, U256>>,
    pub allowances: Mutex<HashMap<Address, U256>>,
    pub fail_reads: bool,
    pub fail_estimate: bool,
    pub gas_price: u128,
    pub estimate: u64,
    pub mining: Mining,
    pub receipt_status: u64,
    pub head: u64,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub submitted_at: Mutex<HashMap<TxHash, tokio::time::Instant>>,
    pub nonce: AtomicU64,
}

impl Default for MockRpc {
    fn default() -> Self {
        Self {
            numeric_id: ZKEVM_ID,
            native: Mutex::new(VecDeque::from([ether(10)])),
            token_balances: Mutex::new(HashMap::new()),
            allowances: Mutex::new(HashMap::new()),
            fail_reads: false,
            fail_estimate: false,
            gas_price: 2_000_000_000,
            estimate: 100_000,
            mining: Mining::After(Duration::from_millis(50)),
            receipt_status: 1,
            head: 1_000,
            sent: Mutex::new(Vec::new()),
            submitted_at: Mutex::new(HashMap::new()),
            nonce: AtomicU64::new(0),
        }
    }
}

impl MockRpc {
    pub fn with_native(self, balances: impl IntoIterator<Item = U256>) -> Self {
        *self.native.lock().unwrap() = balances.into_iter().collect();
        self
    }

    pub fn with_token_balance(self, token: Address, balance: U256) -> Self {
        self.token_balances.lock().unwrap().insert(token, balance);
        self
    }

    pub fn with_allowance(self, token: Address, allowance: U256) -> Self {
        self.allowances.lock().unwrap().insert(token, allowance);
        self
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }

    fn read_error(&self) -> BlockchainError {
        BlockchainError::Rpc("mock read failure".to_string())
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    fn numeric_id(&self) -> u64 {
        self.numeric_id
    }

    async fn get_balance(&self, _owner: Address) -> BlockchainResult<U256> {
        if self.fail_reads {
            return Err(self.read_error());
        }
        let mut native = self.native.lock().unwrap();
        let value = if native.len() > 1 {
            native.pop_front()
        } else {
            native.front().copied()
        };
        Ok(value.unwrap_or(U256::ZERO))
    }

    async fn call(&self, to: Address, input: Bytes) -> BlockchainResult<Bytes> {
        if self.fail_reads {
            return Err(self.read_error());
        }
        let value = if input.starts_with(&selector("balanceOf(address)")) {
            self.token_balances.lock().unwrap().get(&to).copied().unwrap_or_default()
        } else if input.starts_with(&selector("allowance(address,address)")) {
            self.allowances.lock().unwrap().get(&to).copied().unwrap_or_default()
        } else {
            return Err(BlockchainError::Rpc("unsupported call".to_string()));
        };
        Ok(Bytes::from(value.abi_encode()))
    }

    async fn estimate_gas(&self, _request: TransactionRequest) -> BlockchainResult<u64> {
        if self.fail_estimate {
            return Err(BlockchainError::Rpc("execution reverted".to_string()));
        }
        Ok(self.estimate)
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        Ok(self.gas_price)
    }

    async fn latest_base_fee(&self) -> BlockchainResult<Option<u128>> {
        Ok(Some(1_000_000_000))
    }

    async fn send_transaction(&self, request: TransactionRequest) -> BlockchainResult<TxHash> {
        let n = self.nonce.fetch_add(1, Ordering::SeqCst);
        let hash = keccak256(n.to_be_bytes());
        self.sent.lock().unwrap().push(request);
        self.submitted_at
            .lock()
            .unwrap()
            .insert(hash, tokio::time::Instant::now());
        Ok(hash)
    }

    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<ReceiptInfo>> {
        let Mining::After(delay) = self.mining else {
            return Ok(None);
        };
        let mined = self
            .submitted_at
            .lock()
            .unwrap()
            .get(&hash)
            .is_some_and(|at| at.elapsed() >= delay);
        Ok(mined.then_some(ReceiptInfo {
            hash,
            block_number: Some(self.head),
            status: self.receipt_status,
        }))
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        Ok(self.head)
    }
}

/// One chain's view of the shared [`MockRpc`] state.
///
/// Reports the chain's own id and refuses requests whose chain id differs
/// from the signer the handle was opened with.
pub struct ChainView {
    numeric_id: u64,
    signer_chain_id: Option<u64>,
    mock: Arc<MockRpc>,
}

#[async_trait]
impl ChainRpc for ChainView {
    fn numeric_id(&self) -> u64 {
        self.numeric_id
    }

    async fn get_balance(&self, owner: Address) -> BlockchainResult<U256> {
        self.mock.get_balance(owner).await
    }

    async fn call(&self, to: Address, input: Bytes) -> BlockchainResult<Bytes> {
        self.mock.call(to, input).await
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> BlockchainResult<u64> {
        self.mock.estimate_gas(request).await
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.mock.gas_price().await
    }

    async fn latest_base_fee(&self) -> BlockchainResult<Option<u128>> {
        self.mock.latest_base_fee().await
    }

    async fn send_transaction(&self, request: TransactionRequest) -> BlockchainResult<TxHash> {
        if request.chain_id != self.signer_chain_id {
            return Err(BlockchainError::Wallet(format!(
                "transaction chain id {:?} does not match signer chain id {:?}",
                request.chain_id, self.signer_chain_id
            )));
        }
        self.mock.send_transaction(request).await
    }

    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<ReceiptInfo>> {
        self.mock.get_receipt(hash).await
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.mock.block_number().await
    }
}

/// Opens a [`ChainView`] per chain over one shared mock, gated by the relay.
pub struct MockFactory(pub Arc<MockRpc>);

impl RpcFactory for MockFactory {
    fn connect(
        &self,
        chain: Chain,
        session: &WalletSession,
        relay: &NetworkRelay,
    ) -> BlockchainResult<Arc<dyn ChainRpc>> {
        relay.http()?;
        let chains = ChainRegistry::default();
        let signer = chains.chain_signer(chain, session)?;
        Ok(Arc::new(ChainView {
            numeric_id: chains.get_numeric_id(chain)?,
            signer_chain_id: signer.chain_id(),
            mock: self.0.clone(),
        }))
    }
}

/// Configuration with every wait removed and no proxy enforcement.
pub fn test_config(record_path: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.delays.wallet = DelayRange::ZERO;
    config.delays.module = DelayRange::ZERO;
    config.delays.tx_cooldown = DelayRange::ZERO;
    config.delays.secondary_act = DelayRange::ZERO;
    config.proxy.enforce = false;
    config.proxy.rpc_requests = false;
    config.gas.max_gwei = None;
    config.confirmation.poll_interval_ms = 20;
    config.poller.interval_secs = 0;
    config.processed_record_path = record_path.display().to_string();
    config
}

pub fn test_services(config: AppConfig, tokens: TokenRegistry, rpc: Arc<MockRpc>) -> Services {
    Services {
        record: ProcessedRecord::new(&config.processed_record_path),
        config: Arc::new(config),
        chains: Arc::new(ChainRegistry::default()),
        tokens: Arc::new(tokens),
        rpc: Arc::new(MockFactory(rpc)),
    }
}

/// Ready context for identity `name` backed by `rpc`.
pub async fn test_context(services: &Services, name: &str) -> IdentityContext {
    let session = WalletSession::init(TEST_PRIVATE_KEY, name, ZKEVM_ID).unwrap();
    let mut relay = NetworkRelay::new(services.config.proxy.clone());
    relay.initialize(None).await.unwrap();
    IdentityContext::new(services, session, relay)
}

/// Serve `body` as JSON to every request on an ephemeral port.
pub async fn start_json_server(body: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Arc::new(body);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let body = body.clone();
                    tokio::spawn(async move {
                        read_request(&mut socket).await;
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Serve `{"ip": ip}`. Also works as a forward proxy for plain-HTTP targets.
pub async fn start_ip_echo(ip: &str) -> SocketAddr {
    start_json_server(format!(r#"{{"ip":"{}"}}"#, ip)).await
}

async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let body_len = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    let mut received = buf.len() - (end + 4);
                    // Consume the body before replying.
                    while received < body_len {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => received += n,
                        }
                    }
                    return;
                }
            }
        }
    }
}
