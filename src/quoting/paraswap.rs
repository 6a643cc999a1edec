//! QuickSwap routes on zkEVM through the Paraswap API.

use alloy::primitives::{address, Address};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::blockchain::types::{BlockchainError, BlockchainResult, TransactionIntent};
use crate::quoting::router::{fetch_json, SwapRouter};
use crate::quoting::types::{SwapQuoteRequest, TxPayload};

pub const DEFAULT_API_URL: &str = "https://api.paraswap.io";

/// QuickSwap token transfer proxy on zkEVM.
pub const QUICKSWAP_SPENDER: Address = address!("b83b554730d29ce4cb55bb42206c3e2c03e4a40a");

const PARTNER: &str = "quickswapv3";
const INCLUDE_DEXS: &str = "quickswap,quickswapv3,quickswapv3.1,quickperps";
const ORIGIN: &str = "https://quickswap.exchange";
const REFERER: &str = "https://quickswap.exchange/";

/// Fixed gas limit window for swaps built by this venue.
const GAS_LIMIT_RANGE: (u64, u64) = (525_000, 600_000);

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(rename = "priceRoute")]
    price_route: Option<Value>,
    error: Option<String>,
}

/// Paraswap-backed router restricted to QuickSwap pools.
#[derive(Debug, Clone)]
pub struct ParaswapRouter {
    base_url: String,
    network: u64,
    spender: Address,
}

impl ParaswapRouter {
    pub fn new(base_url: Option<&str>, network: u64) -> Self {
        Self {
            base_url: base_url.unwrap_or(DEFAULT_API_URL).trim_end_matches('/').to_string(),
            network,
            spender: QUICKSWAP_SPENDER,
        }
    }

    async fn price_route(&self, http: &reqwest::Client, request: &SwapQuoteRequest) -> BlockchainResult<Value> {
        let query: Vec<(&str, String)> = vec![
            ("srcToken", request.src_token.to_string()),
            ("destToken", request.dst_token.to_string()),
            ("network", self.network.to_string()),
            ("partner", PARTNER.to_string()),
            ("includeDEXS", INCLUDE_DEXS.to_string()),
            ("srcDecimals", request.src_decimals.to_string()),
            ("destDecimals", request.dst_decimals.to_string()),
            ("amount", request.amount.to_string()),
            ("side", "SELL".to_string()),
            ("maxImpact", "15".to_string()),
        ];

        let response: PricesResponse = fetch_json(
            http.get(format!("{}/prices/", self.base_url))
                .header("origin", ORIGIN)
                .header("referer", REFERER)
                .query(&query),
        )
        .await?;

        match (response.price_route, response.error) {
            (Some(route), _) => Ok(route),
            (None, Some(error)) => Err(BlockchainError::Quote(error)),
            (None, None) => Err(BlockchainError::Quote("no price route returned".to_string())),
        }
    }
}

/// Body of the transaction build call for `price_route`.
fn transaction_body(price_route: &Value, user: Address) -> Value {
    let user = user.to_string().to_lowercase();
    let field = |key: &str| price_route.get(key).cloned().unwrap_or(Value::Null);
    let lower = |key: &str| {
        price_route
            .get(key)
            .and_then(Value::as_str)
            .map(|s| Value::String(s.to_lowercase()))
            .unwrap_or(Value::Null)
    };

    json!({
        "destAmount": field("destAmount"),
        "destToken": lower("destToken"),
        "partner": PARTNER,
        "priceRoute": price_route,
        "receiver": user,
        "srcAmount": field("srcAmount"),
        "srcToken": lower("srcToken"),
        "userAddress": user,
    })
}

#[async_trait]
impl SwapRouter for ParaswapRouter {
    fn name(&self) -> &'static str {
        "QuickSwap"
    }

    fn spender(&self) -> Address {
        self.spender
    }

    async fn build_swap(&self, http: &reqwest::Client, request: &SwapQuoteRequest) -> BlockchainResult<TransactionIntent> {
        let route = self.price_route(http, request).await?;
        tracing::debug!(route = %route, "Price route");

        let payload: TxPayload = fetch_json(
            http.post(format!("{}/transactions/{}/", self.base_url, self.network))
                .header("origin", ORIGIN)
                .header("referer", REFERER)
                .json(&transaction_body(&route, request.user)),
        )
        .await?;

        let mut intent = payload.into_intent();
        intent.gas_limit = Some(rand::thread_rng().gen_range(GAS_LIMIT_RANGE.0..=GAS_LIMIT_RANGE.1));
        Ok(intent)
    }
}
