//! Wrap native ETH into WETH, or unwrap an existing WETH balance.

use alloy::primitives::Address;

use crate::blockchain::amount::setup_amount;
use crate::blockchain::erc20;
use crate::blockchain::tokens::{format_units, Token};
use crate::blockchain::transaction::TxPipeline;
use crate::blockchain::types::BlockchainResult;
use crate::chains::Chain;
use crate::config::WrapConfig;
use crate::context::IdentityContext;

pub struct WrapModule {
    config: WrapConfig,
}

impl WrapModule {
    pub fn new(config: WrapConfig) -> Self {
        Self { config }
    }

    pub fn chain(&self) -> Chain {
        self.config.chain
    }

    fn weth(&self) -> Address {
        self.config.weth_address
    }

    /// Unwrap when holding WETH, wrap otherwise.
    pub async fn act(&self, ctx: &IdentityContext) -> BlockchainResult<()> {
        let chain = self.config.chain;
        let pipeline = TxPipeline::new(ctx, chain)?;
        let wrapped = erc20::balance_of(pipeline.rpc(), self.weth(), ctx.session.address()).await?;

        if wrapped.is_zero() {
            tracing::info!(chain = %chain, "Starting wrap");
            let value = setup_amount(ctx, Token::NATIVE, None, chain, None, false).await?;
            let message = format!("wrap {} eth", format_units(value, 18));
            pipeline
                .send_transaction(&erc20::deposit_intent(self.weth(), value), &message)
                .await?;
        } else {
            tracing::info!(chain = %chain, "Starting unwrap");
            let message = format!("unwrap {} eth", format_units(wrapped, 18));
            pipeline
                .send_transaction(&erc20::withdraw_intent(self.weth(), wrapped), &message)
                .await?;
        }
        Ok(())
    }
}
