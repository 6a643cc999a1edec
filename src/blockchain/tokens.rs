//! Token registry and balance aggregation.
//!
//! # Responsibilities
//! - Static token table (address, decimals, default amount range)
//! - Decimals-aware formatting and parsing of raw amounts
//! - Single and batched balance reads for the active wallet
//! - Random pair selection over the registered tokens

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use alloy::primitives::{address, Address, U256};
use futures_util::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::blockchain::client::ChainRpc;
use crate::blockchain::erc20;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Placeholder address route providers use for the native asset.
pub const NATIVE_ADDRESS: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Supported tokens on the settlement chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    Eth,
    Weth,
    Usdc,
    Usdt,
    Matic,
    Dai,
    Wbtc,
}

impl Token {
    pub const ALL: [Token; 7] = [
        Token::Eth,
        Token::Weth,
        Token::Usdc,
        Token::Usdt,
        Token::Matic,
        Token::Dai,
        Token::Wbtc,
    ];

    /// Reserved id of the native asset.
    pub const NATIVE: Token = Token::Eth;

    /// Position in [`Token::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Token::Eth => 0,
            Token::Weth => 1,
            Token::Usdc => 2,
            Token::Usdt => 3,
            Token::Matic => 4,
            Token::Dai => 5,
            Token::Wbtc => 6,
        }
    }

    pub fn is_native(&self) -> bool {
        *self == Token::NATIVE
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Eth => "ETH",
            Token::Weth => "WETH",
            Token::Usdc => "USDC",
            Token::Usdt => "USDT",
            Token::Matic => "MATIC",
            Token::Dai => "DAI",
            Token::Wbtc => "WBTC",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Inclusive decimal amount range, e.g. `[0.003, 0.004]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Static information about one token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub token: Token,
    /// `None` for the native asset.
    pub contract: Option<Address>,
    pub decimals: u8,
    pub default_range: Option<AmountRange>,
}

impl TokenInfo {
    /// Built-in settlement-chain entry for `token`.
    pub fn builtin(token: Token) -> Self {
        let (contract, decimals) = match token {
            Token::Eth => (None, 18),
            Token::Weth => (Some(address!("4F9A0e7FD2Bf6067db6994CF12E4495Df938E6e9")), 18),
            Token::Usdc => (Some(address!("A8CE8aee21bC2A48a5EF670afCc9274C7bbbC035")), 6),
            Token::Usdt => (Some(address!("1E4a5963aBFD975d8c9021ce480b42188849D41d")), 6),
            Token::Matic => (Some(address!("a2036f0538221a77A3937F1379699f44945018d0")), 18),
            Token::Dai => (Some(address!("C5015b9d9161Dca7e18e32f6f25C4aD850731Fd4")), 18),
            Token::Wbtc => (Some(address!("EA034fb02eB1808C2cc3adbC15f447B93CbE08e1")), 8),
        };
        let default_range = token.is_native().then_some(AmountRange::new(0.0002, 0.0005));

        Self {
            token,
            contract,
            decimals,
            default_range,
        }
    }
}

/// What to do when no token with balance survives the exclusion list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairFallback {
    /// Draw the first token from every non-excluded token.
    #[default]
    WidenToAll,
    /// Refuse with [`BlockchainError::InsufficientTokenUniverse`].
    Fail,
}

/// Immutable token table for the settlement chain, indexed by [`Token::index`].
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    tokens: [TokenInfo; Token::ALL.len()],
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self {
            tokens: Token::ALL.map(TokenInfo::builtin),
        }
    }
}

impl TokenRegistry {
    pub fn info(&self, token: Token) -> &TokenInfo {
        &self.tokens[token.index()]
    }

    pub fn tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.tokens.iter().map(|info| info.token)
    }

    /// Contract address, or [`NATIVE_ADDRESS`] for the native asset.
    pub fn get_address(&self, token: Token) -> Address {
        self.info(token).contract.unwrap_or(NATIVE_ADDRESS)
    }

    pub fn get_decimals(&self, token: Token) -> u8 {
        self.info(token).decimals
    }

    pub fn default_range(&self, token: Token) -> Option<AmountRange> {
        self.info(token).default_range
    }

    /// Replace the default amount range of `token`.
    pub fn with_default_range(mut self, token: Token, range: Option<AmountRange>) -> Self {
        self.tokens[token.index()].default_range = range;
        self
    }

    pub fn format_amount(&self, token: Token, raw: U256) -> String {
        format_units(raw, self.get_decimals(token))
    }

    pub fn parse_amount(&self, token: Token, amount: &str) -> BlockchainResult<U256> {
        parse_units(amount, self.get_decimals(token))
    }

    /// Single balance read: native balance or `balanceOf`.
    pub async fn get_balance(&self, rpc: &dyn ChainRpc, token: Token, owner: Address) -> BlockchainResult<U256> {
        match self.info(token).contract {
            None => rpc.get_balance(owner).await,
            Some(contract) => erc20::balance_of(rpc, contract, owner).await,
        }
    }

    /// Balances of every registered token.
    ///
    /// Reads run concurrently. A failed or empty read counts as zero.
    pub async fn aggregate_balances(&self, rpc: &dyn ChainRpc, owner: Address) -> BTreeMap<Token, U256> {
        let contract_tokens: Vec<(Token, Address)> = self
            .tokens
            .iter()
            .filter_map(|info| info.contract.map(|c| (info.token, c)))
            .collect();

        let reads = contract_tokens
            .iter()
            .map(|(_, contract)| erc20::balance_of(rpc, *contract, owner));
        let (results, native) = tokio::join!(join_all(reads), rpc.get_balance(owner));

        let mut balances = BTreeMap::new();
        for ((token, _), result) in contract_tokens.iter().zip(results) {
            let balance = result.unwrap_or_else(|e| {
                tracing::debug!(token = %token, error = %e, "Balance read failed, counting as zero");
                U256::ZERO
            });
            balances.insert(*token, balance);
        }
        let native = native.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Native balance read failed, counting as zero");
            U256::ZERO
        });
        balances.insert(Token::NATIVE, native);

        balances
    }

    /// Read balances and pick a random pair.
    pub async fn pick_random_pair(
        &self,
        rpc: &dyn ChainRpc,
        owner: Address,
        request: &PairRequest,
    ) -> BlockchainResult<(Token, Token)> {
        let balances = self.aggregate_balances(rpc, owner).await;
        let mut rng = rand::thread_rng();
        self.select_pair(&balances, request, &mut rng)
    }

    /// Pure pair selection over known balances.
    pub fn select_pair<R: Rng + ?Sized>(
        &self,
        balances: &BTreeMap<Token, U256>,
        request: &PairRequest,
        rng: &mut R,
    ) -> BlockchainResult<(Token, Token)> {
        let all: Vec<Token> = self
            .tokens()
            .filter(|t| !request.excluded.contains(t))
            .collect();
        if all.len() < 2 {
            return Err(BlockchainError::InsufficientTokenUniverse { available: all.len() });
        }

        let with_balance: Vec<Token> = all
            .iter()
            .copied()
            .filter(|t| balances.get(t).is_some_and(|b| !b.is_zero()))
            .collect();

        let first = match request.forced_first {
            Some(token) => token,
            None => {
                let pool = if !with_balance.is_empty() {
                    &with_balance
                } else {
                    match request.fallback {
                        PairFallback::WidenToAll => &all,
                        PairFallback::Fail => {
                            return Err(BlockchainError::InsufficientTokenUniverse { available: 0 })
                        }
                    }
                };
                *pool
                    .choose(rng)
                    .ok_or(BlockchainError::InsufficientTokenUniverse { available: 0 })?
            }
        };

        let second_pool = if request.only_nonzero_balance {
            &with_balance
        } else {
            &all
        };
        let candidates: Vec<Token> = second_pool.iter().copied().filter(|t| *t != first).collect();

        let second = *candidates
            .choose(rng)
            .ok_or(BlockchainError::InsufficientTokenUniverse {
                available: candidates.len() + 1,
            })?;

        Ok((first, second))
    }
}

/// Parameters for [`TokenRegistry::pick_random_pair`].
#[derive(Debug, Clone, Default)]
pub struct PairRequest {
    pub excluded: BTreeSet<Token>,
    pub only_nonzero_balance: bool,
    pub forced_first: Option<Token>,
    pub fallback: PairFallback,
}

/// Format a raw amount with `decimals`, trimming trailing zeros.
pub fn format_units(raw: U256, decimals: u8) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = raw / divisor;
    let remainder = raw % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }
    let decimal_str = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
    format!("{}.{}", whole, decimal_str.trim_end_matches('0'))
}

/// Parse a decimal string into raw units.
pub fn parse_units(amount: &str, decimals: u8) -> BlockchainResult<U256> {
    let invalid = |why: &str| BlockchainError::InvalidAmount(format!("'{}': {}", amount, why));
    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("empty"));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid("too many decimal places"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a decimal number"));
    }

    let digits = format!("{}{:0<width$}", whole, fraction, width = decimals as usize);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| invalid("overflow"))
}
