//! Amount selection and approval tests.

use std::sync::Arc;

use alloy::primitives::{Address, U256};

use tx_conductor::blockchain::amount::setup_amount;
use tx_conductor::blockchain::tokens::{AmountRange, Token, TokenRegistry};
use tx_conductor::blockchain::types::BlockchainError;
use tx_conductor::chains::Chain;

mod common;
use common::MockRpc;

const USDC: u64 = 1_000_000;

fn spender() -> Address {
    Address::repeat_byte(0x5f)
}

#[tokio::test]
async fn test_native_amount_within_range() {
    let dir = tempfile::tempdir().unwrap();
    let rpc = Arc::new(MockRpc::default().with_native([common::ether(10)]));
    let services = common::test_services(
        common::test_config(&dir.path().join("processed.txt")),
        TokenRegistry::default(),
        rpc.clone(),
    );
    let ctx = common::test_context(&services, "7").await;

    let amount = setup_amount(
        &ctx,
        Token::Eth,
        None,
        Chain::Zkevm,
        Some(AmountRange::new(0.003, 0.004)),
        false,
    )
    .await
    .unwrap();

    assert!(amount >= common::ether(3) && amount <= common::ether(4), "{}", amount);
    assert!(rpc.sent().is_empty());
}

#[tokio::test]
async fn test_token_amount_above_balance() {
    let dir = tempfile::tempdir().unwrap();
    let registry = TokenRegistry::default();
    let usdc = registry.get_address(Token::Usdc);
    let rpc = Arc::new(MockRpc::default().with_token_balance(usdc, U256::from(2 * USDC)));
    let services = common::test_services(
        common::test_config(&dir.path().join("processed.txt")),
        registry,
        rpc.clone(),
    );
    let ctx = common::test_context(&services, "7").await;

    let err = setup_amount(
        &ctx,
        Token::Usdc,
        Some(spender()),
        Chain::Zkevm,
        Some(AmountRange::new(5.0, 5.0)),
        false,
    )
    .await
    .unwrap_err();

    match err {
        BlockchainError::AmountExceedsBalance { requested, balance } => {
            assert_eq!(requested, U256::from(5 * USDC));
            assert_eq!(balance, U256::from(2 * USDC));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(rpc.sent().is_empty());
}

#[tokio::test]
async fn test_approval_only_when_allowance_short() {
    let dir = tempfile::tempdir().unwrap();
    let registry = TokenRegistry::default();
    let usdc = registry.get_address(Token::Usdc);
    let rpc = Arc::new(
        MockRpc::default()
            .with_token_balance(usdc, U256::from(10 * USDC))
            .with_allowance(usdc, U256::from(USDC)),
    );
    let services = common::test_services(
        common::test_config(&dir.path().join("processed.txt")),
        registry,
        rpc.clone(),
    );
    let ctx = common::test_context(&services, "7").await;

    let amount = setup_amount(
        &ctx,
        Token::Usdc,
        Some(spender()),
        Chain::Zkevm,
        Some(AmountRange::new(3.0, 3.0)),
        false,
    )
    .await
    .unwrap();
    assert_eq!(amount, U256::from(3 * USDC));

    let sent = rpc.sent();
    assert_eq!(sent.len(), 1, "one approval expected");
    assert_eq!(sent[0].to.and_then(|kind| kind.to().copied()), Some(usdc));

    // Allowance now covers the amount: nothing is sent.
    rpc.allowances.lock().unwrap().insert(usdc, U256::from(10 * USDC));
    setup_amount(
        &ctx,
        Token::Usdc,
        Some(spender()),
        Chain::Zkevm,
        Some(AmountRange::new(3.0, 3.0)),
        false,
    )
    .await
    .unwrap();
    assert_eq!(rpc.sent().len(), 1);
}

#[tokio::test]
async fn test_use_max_available_takes_full_balance() {
    let dir = tempfile::tempdir().unwrap();
    let registry = TokenRegistry::default();
    let usdc = registry.get_address(Token::Usdc);
    let rpc = Arc::new(MockRpc::default().with_token_balance(usdc, U256::from(2 * USDC)));
    let services = common::test_services(
        common::test_config(&dir.path().join("processed.txt")),
        registry,
        rpc,
    );
    let ctx = common::test_context(&services, "7").await;

    let amount = setup_amount(
        &ctx,
        Token::Usdc,
        None,
        Chain::Zkevm,
        Some(AmountRange::new(5.0, 5.0)),
        true,
    )
    .await
    .unwrap();
    assert_eq!(amount, U256::from(2 * USDC));
}

#[tokio::test]
async fn test_native_without_range_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let registry = TokenRegistry::default().with_default_range(Token::Eth, None);
    let services = common::test_services(
        common::test_config(&dir.path().join("processed.txt")),
        registry,
        Arc::new(MockRpc::default()),
    );
    let ctx = common::test_context(&services, "7").await;

    let err = setup_amount(&ctx, Token::Eth, None, Chain::Zkevm, None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, BlockchainError::NoValidAmount(_)));
}

#[tokio::test]
async fn test_native_sweep_keeps_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let registry = TokenRegistry::default().with_default_range(Token::Eth, None);
    let mut config = common::test_config(&dir.path().join("processed.txt"));
    config.prevent_sending_max_ether = false;
    let services = common::test_services(
        config,
        registry,
        Arc::new(MockRpc::default().with_native([common::ether(10)])),
    );
    let ctx = common::test_context(&services, "7").await;

    let amount = setup_amount(&ctx, Token::Eth, None, Chain::Zkevm, None, false)
        .await
        .unwrap();
    assert_eq!(amount, common::ether(7));
}
