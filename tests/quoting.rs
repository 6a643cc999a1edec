//! Route providers against a local JSON server.

use alloy::primitives::{address, Address, U256};

use tx_conductor::blockchain::tokens::{Token, TokenRegistry, NATIVE_ADDRESS};
use tx_conductor::blockchain::types::BlockchainError;
use tx_conductor::config::ProxySettings;
use tx_conductor::net::NetworkRelay;
use tx_conductor::quoting::{BridgeQuoteRequest, BridgeRouter, ParaswapRouter, SwapQuoteRequest, SwapRouter, XyFinanceRouter};

mod common;

const TARGET: Address = address!("3333333333333333333333333333333333333333");

async fn direct_relay() -> NetworkRelay {
    let mut relay = NetworkRelay::new(ProxySettings {
        enforce: false,
        rpc_requests: false,
        ..ProxySettings::default()
    });
    relay.initialize(None).await.unwrap();
    relay
}

fn swap_request() -> SwapQuoteRequest {
    let tokens = TokenRegistry::default();
    SwapQuoteRequest {
        src_token: NATIVE_ADDRESS,
        dst_token: tokens.get_address(Token::Usdc),
        src_decimals: 18,
        dst_decimals: 6,
        amount: U256::from(3_000_000_000_000_000u64),
        user: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
    }
}

#[tokio::test]
async fn test_paraswap_builds_swap_with_fixed_gas_window() {
    let body = format!(
        r#"{{"priceRoute":{{"srcToken":"{}","destToken":"{}","srcAmount":"3000000000000000","destAmount":"9000000"}},"to":"{}","data":"0x5678","value":"3000000000000000"}}"#,
        NATIVE_ADDRESS, TARGET, TARGET
    );
    let api = common::start_json_server(body).await;
    let relay = direct_relay().await;

    let router = ParaswapRouter::new(Some(&format!("http://{}", api)), common::ZKEVM_ID);
    let intent = router.build_swap(relay.http().unwrap(), &swap_request()).await.unwrap();

    assert_eq!(intent.to, TARGET);
    assert_eq!(intent.value, U256::from(3_000_000_000_000_000u64));
    assert_eq!(&intent.input[..], &[0x56u8, 0x78][..]);
    let gas = intent.gas_limit.unwrap();
    assert!((525_000..=600_000).contains(&gas));
    assert!(router.build_add_liquidity(relay.http().unwrap(), &swap_request()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_paraswap_error_is_quote_error() {
    let api = common::start_json_server(r#"{"error":"No routes found with enough liquidity"}"#.to_string()).await;
    let relay = direct_relay().await;

    let router = ParaswapRouter::new(Some(&format!("http://{}", api)), common::ZKEVM_ID);
    let err = router.build_swap(relay.http().unwrap(), &swap_request()).await.unwrap_err();

    match err {
        BlockchainError::Quote(message) => assert!(message.contains("enough liquidity")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_xy_without_routes_reports_provider_message() {
    let api = common::start_json_server(r#"{"success":false,"routes":[],"errorMsg":"amount too small"}"#.to_string()).await;
    let relay = direct_relay().await;

    let router = XyFinanceRouter::new(Some(&format!("http://{}/", api)));
    let request = BridgeQuoteRequest {
        src_chain_id: 8453,
        dst_chain_id: common::ZKEVM_ID,
        amount: U256::from(1u64),
        receiver: TARGET,
    };
    let err = router.build_bridge(relay.http().unwrap(), &request).await.unwrap_err();

    assert!(matches!(err, BlockchainError::Quote(ref m) if m == "amount too small"), "{:?}", err);
}

#[tokio::test]
async fn test_unreachable_provider_is_quote_error() {
    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let relay = direct_relay().await;

    let router = XyFinanceRouter::new(Some(&format!("http://{}", closed)));
    let request = BridgeQuoteRequest {
        src_chain_id: 8453,
        dst_chain_id: common::ZKEVM_ID,
        amount: U256::from(1u64),
        receiver: TARGET,
    };
    let err = router.build_bridge(relay.http().unwrap(), &request).await.unwrap_err();
    assert!(matches!(err, BlockchainError::Quote(_)));
}
