//! XY Finance bridge routes.

use std::str::FromStr;

use alloy::primitives::{address, Address, U256};
use async_trait::async_trait;
use serde::Deserialize;

use crate::blockchain::tokens::NATIVE_ADDRESS;
use crate::blockchain::types::{BlockchainError, BlockchainResult, TransactionIntent};
use crate::quoting::router::{fetch_json, BridgeRouter};
use crate::quoting::types::{BridgeQuoteRequest, TxPayload};

pub const DEFAULT_API_URL: &str = "https://router-api.xy.finance";

const AFFILIATE: Address = address!("90d67a9eac7324a1a2942d6dea9f6174ad6048c9");
const ORIGIN: &str = "https://app.xy.finance";
const REFERER: &str = "https://app.xy.finance/";

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeDescription {
    pub provider: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    pub min_receive_amount: String,
    pub bridge_description: BridgeDescription,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(rename = "errorMsg")]
    error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildResponse {
    tx: Option<TxPayload>,
    #[serde(rename = "errorMsg")]
    error_msg: Option<String>,
}

/// Route with the largest guaranteed receive amount.
pub fn best_route(routes: &[Route]) -> Option<&Route> {
    routes
        .iter()
        .max_by_key(|r| U256::from_str(&r.min_receive_amount).unwrap_or(U256::ZERO))
}

#[derive(Debug, Clone)]
pub struct XyFinanceRouter {
    base_url: String,
}

impl XyFinanceRouter {
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url.unwrap_or(DEFAULT_API_URL).trim_end_matches('/').to_string(),
        }
    }

    fn base_query(request: &BridgeQuoteRequest) -> Vec<(&'static str, String)> {
        vec![
            ("src_chain_id", request.src_chain_id.to_string()),
            ("src_quote_token_address", NATIVE_ADDRESS.to_string()),
            ("src_quote_token_amount", request.amount.to_string()),
            ("dst_chain_id", request.dst_chain_id.to_string()),
            ("dst_quote_token_address", NATIVE_ADDRESS.to_string()),
            ("slippage", "1".to_string()),
            ("affiliate", AFFILIATE.to_string()),
            ("commission_rate", "0".to_string()),
        ]
    }

    async fn best_provider(&self, http: &reqwest::Client, request: &BridgeQuoteRequest) -> BlockchainResult<String> {
        let response: QuoteResponse = fetch_json(
            http.get(format!("{}/xy_router/quote", self.base_url))
                .header("origin", ORIGIN)
                .header("referer", REFERER)
                .query(&Self::base_query(request)),
        )
        .await?;

        match best_route(&response.routes) {
            Some(route) => Ok(route.bridge_description.provider.clone()),
            None => Err(BlockchainError::Quote(
                response.error_msg.unwrap_or_else(|| "no bridge route".to_string()),
            )),
        }
    }
}

#[async_trait]
impl BridgeRouter for XyFinanceRouter {
    fn name(&self) -> &'static str {
        "XY Finance"
    }

    async fn build_bridge(
        &self,
        http: &reqwest::Client,
        request: &BridgeQuoteRequest,
    ) -> BlockchainResult<TransactionIntent> {
        let provider = self.best_provider(http, request).await?;
        tracing::info!(provider = %provider, "Selected bridge route");

        let mut query = Self::base_query(request);
        query.extend([
            ("receiver", request.receiver.to_string()),
            ("bridge_provider", provider),
            ("src_bridge_token_address", NATIVE_ADDRESS.to_string()),
            ("dst_bridge_token_address", NATIVE_ADDRESS.to_string()),
        ]);

        let response: BuildResponse = fetch_json(
            http.get(format!("{}/xy_router/build_tx", self.base_url))
                .header("origin", ORIGIN)
                .header("referer", REFERER)
                .query(&query),
        )
        .await?;

        match response.tx {
            Some(tx) => Ok(tx.into_intent()),
            None => Err(BlockchainError::Quote(
                response.error_msg.unwrap_or_else(|| "bridge build returned no transaction".to_string()),
            )),
        }
    }
}
