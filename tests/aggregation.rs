//! Balance aggregation and pair selection against a mock chain.

use std::collections::BTreeSet;
use std::sync::Arc;

use alloy::primitives::{Address, U256};

use tx_conductor::blockchain::tokens::{PairFallback, PairRequest, Token, TokenRegistry};
use tx_conductor::blockchain::types::BlockchainError;

mod common;
use common::MockRpc;

fn owner() -> Address {
    Address::repeat_byte(0x42)
}

#[tokio::test]
async fn test_failed_reads_count_as_zero() {
    let registry = TokenRegistry::default();
    let rpc = MockRpc {
        fail_reads: true,
        ..MockRpc::default()
    };

    let balances = registry.aggregate_balances(&rpc, owner()).await;

    assert_eq!(balances.len(), Token::ALL.len());
    for token in Token::ALL {
        assert_eq!(balances.get(&token), Some(&U256::ZERO), "{}", token);
    }
}

#[tokio::test]
async fn test_aggregate_mixes_native_and_contract_reads() {
    let registry = TokenRegistry::default();
    let dai = registry.get_address(Token::Dai);
    let rpc = MockRpc::default()
        .with_native([common::ether(5)])
        .with_token_balance(dai, common::ether(1_000));

    let balances = registry.aggregate_balances(&rpc, owner()).await;

    assert_eq!(balances[&Token::Eth], common::ether(5));
    assert_eq!(balances[&Token::Dai], common::ether(1_000));
    assert_eq!(balances[&Token::Usdc], U256::ZERO);
}

#[tokio::test]
async fn test_pick_pair_starts_from_funded_token() {
    let registry = TokenRegistry::default();
    let usdt = registry.get_address(Token::Usdt);
    let rpc = Arc::new(
        MockRpc::default()
            .with_native([U256::ZERO])
            .with_token_balance(usdt, U256::from(1_000_000u64)),
    );
    let request = PairRequest::default();

    for _ in 0..20 {
        let (first, second) = registry.pick_random_pair(rpc.as_ref(), owner(), &request).await.unwrap();
        assert_eq!(first, Token::Usdt);
        assert_ne!(second, Token::Usdt);
    }
}

#[tokio::test]
async fn test_pick_pair_fails_without_funds_when_configured() {
    let registry = TokenRegistry::default();
    let rpc = MockRpc {
        fail_reads: true,
        ..MockRpc::default()
    };
    let request = PairRequest {
        excluded: BTreeSet::from([Token::Wbtc]),
        fallback: PairFallback::Fail,
        ..PairRequest::default()
    };

    let err = registry.pick_random_pair(&rpc, owner(), &request).await.unwrap_err();
    assert!(matches!(err, BlockchainError::InsufficientTokenUniverse { available: 0 }));
}
