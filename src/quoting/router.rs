//! Route provider seams.

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::blockchain::types::{BlockchainError, BlockchainResult, TransactionIntent};
use crate::quoting::types::{BridgeQuoteRequest, SwapQuoteRequest};

/// Same-chain token conversion venue.
#[async_trait]
pub trait SwapRouter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Contract that pulls the sold token; approvals target it.
    fn spender(&self) -> Address;

    async fn build_swap(&self, http: &reqwest::Client, request: &SwapQuoteRequest) -> BlockchainResult<TransactionIntent>;

    /// Liquidity provision call, when the venue offers one.
    async fn build_add_liquidity(
        &self,
        _http: &reqwest::Client,
        _request: &SwapQuoteRequest,
    ) -> BlockchainResult<Option<TransactionIntent>> {
        Ok(None)
    }
}

/// Cross-chain native asset transfer venue.
#[async_trait]
pub trait BridgeRouter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn build_bridge(
        &self,
        http: &reqwest::Client,
        request: &BridgeQuoteRequest,
    ) -> BlockchainResult<TransactionIntent>;
}

/// Send `request` and decode a JSON body, mapping every failure to a quote error.
pub(crate) async fn fetch_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> BlockchainResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| BlockchainError::Quote(format!("request failed: {}", e)))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| BlockchainError::Quote(format!("reading body: {}", e)))?;
    if !status.is_success() {
        tracing::warn!(status = %status, body = %body, "Route provider error");
        return Err(BlockchainError::Quote(format!("{}: {}", status, body)));
    }
    serde_json::from_str(&body).map_err(|e| BlockchainError::Quote(format!("decoding body: {}", e)))
}
