//! ERC-20 and WETH contract calls over [`ChainRpc`].

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::client::ChainRpc;
use crate::blockchain::types::{BlockchainError, BlockchainResult, TransactionIntent};

sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }

    interface IWETH {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }
}

/// `balanceOf(owner)` on `token`.
pub async fn balance_of(rpc: &dyn ChainRpc, token: Address, owner: Address) -> BlockchainResult<U256> {
    let input = IERC20::balanceOfCall { account: owner }.abi_encode();
    let output = rpc.call(token, input.into()).await?;
    IERC20::balanceOfCall::abi_decode_returns(&output)
        .map_err(|e| BlockchainError::Rpc(format!("balanceOf decode: {}", e)))
}

/// `allowance(owner, spender)` on `token`.
pub async fn allowance(
    rpc: &dyn ChainRpc,
    token: Address,
    owner: Address,
    spender: Address,
) -> BlockchainResult<U256> {
    let input = IERC20::allowanceCall { owner, spender }.abi_encode();
    let output = rpc.call(token, input.into()).await?;
    IERC20::allowanceCall::abi_decode_returns(&output)
        .map_err(|e| BlockchainError::Rpc(format!("allowance decode: {}", e)))
}

pub fn approve_intent(token: Address, spender: Address, amount: U256) -> TransactionIntent {
    TransactionIntent::call(token, IERC20::approveCall { spender, amount }.abi_encode())
}

pub fn deposit_intent(weth: Address, value: U256) -> TransactionIntent {
    TransactionIntent::call(weth, IWETH::depositCall {}.abi_encode()).with_value(value)
}

pub fn withdraw_intent(weth: Address, wad: U256) -> TransactionIntent {
    TransactionIntent::call(weth, IWETH::withdrawCall { wad }.abi_encode())
}
