//! Driver loop over identities.
//!
//! # Responsibilities
//! - Filter and shuffle identities, one at a time, never concurrently
//! - Build a fresh context per identity (session, relay, proxy check)
//! - Run the planned modules and apply error dispositions
//! - Wait between modules and between identities
//!
//! A fatal error stops only the identity it happened in.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::Instrument;

use crate::blockchain::types::BlockchainResult;
use crate::blockchain::wallet::WalletSession;
use crate::chains::Chain;
use crate::config::{ModuleConfig, ModuleOrder};
use crate::context::{IdentityContext, Services};
use crate::modules::{handle_module_error, ErrorDisposition, Module};
use crate::net::NetworkRelay;
use crate::observability::{metrics, tracing::identity_span, tracing::module_span};
use crate::resilience::cooldown;

/// Runs of one module per identity, counting the first.
const MAX_MODULE_ATTEMPTS: u32 = 2;

/// One wallet to process.
#[derive(Clone, Deserialize)]
pub struct Identity {
    pub name: String,
    pub private_key: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity").field("name", &self.name).finish()
    }
}

/// Totals for one pass over all identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    pub excluded: usize,
}

/// Enabled modules in the order they should run.
pub fn plan_modules<R: Rng + ?Sized>(modules: &[ModuleConfig], order: ModuleOrder, rng: &mut R) -> Vec<ModuleConfig> {
    let mut enabled: Vec<ModuleConfig> = modules.iter().filter(|m| m.enabled()).cloned().collect();
    match order {
        ModuleOrder::Default => enabled,
        ModuleOrder::Random => {
            enabled.shuffle(rng);
            enabled
        }
        ModuleOrder::OneRandom => enabled.choose(rng).cloned().into_iter().collect(),
    }
}

/// Identities not excluded by name, shuffled.
pub fn eligible_identities<R: Rng + ?Sized>(
    identities: Vec<Identity>,
    excluded: &BTreeSet<String>,
    rng: &mut R,
) -> Vec<Identity> {
    let mut eligible: Vec<Identity> = identities
        .into_iter()
        .filter(|identity| {
            let skip = excluded.contains(&identity.name);
            if skip {
                tracing::info!(name = %identity.name, "Skipping excluded wallet");
            }
            !skip
        })
        .collect();
    eligible.shuffle(rng);
    eligible
}

pub struct Runner {
    services: Services,
}

impl Runner {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Session, relay and proxy verification for `identity`.
    pub async fn prepare_identity(&self, identity: &Identity) -> BlockchainResult<IdentityContext> {
        let settlement_id = self.services.chains.get_numeric_id(Chain::SETTLEMENT)?;
        let session = WalletSession::init(identity.private_key.as_str(), &identity.name, settlement_id)?;

        let config = &self.services.config;
        let mut relay = NetworkRelay::new(config.proxy.clone());
        relay.initialize(config.proxies.get(&identity.name)).await?;

        Ok(IdentityContext::new(&self.services, session, relay))
    }

    /// Run one module, retrying once after a funding error.
    pub async fn run_module(&self, ctx: &IdentityContext, module: &mut Module) -> BlockchainResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let Err(err) = module.run(ctx).await else {
                return Ok(());
            };

            let disposition = match handle_module_error(ctx, err, module.kind(), module.home_chain()).await {
                Ok(disposition) => disposition,
                Err(e) => {
                    metrics::record_module_run(module.kind(), "failed");
                    return Err(e);
                }
            };

            match disposition {
                ErrorDisposition::Retry if attempt < MAX_MODULE_ATTEMPTS => {
                    tracing::info!(module = module.kind(), attempt, "Retrying module");
                }
                ErrorDisposition::Retry => {
                    tracing::warn!(module = module.kind(), attempt, "Giving up on module");
                    metrics::record_module_run(module.kind(), "abandoned");
                    return Ok(());
                }
                ErrorDisposition::Skip => {
                    metrics::record_module_run(module.kind(), "skipped");
                    return Ok(());
                }
            }
        }
    }

    /// Every planned module for one prepared identity.
    pub async fn run_modules(&self, ctx: &IdentityContext) -> BlockchainResult<()> {
        let config = &self.services.config;
        let planned = plan_modules(&config.modules, config.order, &mut rand::thread_rng());
        let count = planned.len();

        for (i, module_config) in planned.iter().enumerate() {
            let mut module = Module::from_config(module_config, &self.services.chains)?;
            let span = module_span(module.kind());
            self.run_module(ctx, &mut module).instrument(span).await?;

            if i + 1 < count {
                cooldown(&config.delays.module, "between modules").await;
            }
        }
        Ok(())
    }

    pub async fn process_identity(&self, identity: &Identity) -> BlockchainResult<()> {
        let ctx = self.prepare_identity(identity).await?;
        let span = identity_span(ctx.name(), ctx.session.address());
        self.run_modules(&ctx).instrument(span).await?;
        tracing::info!(name = %identity.name, "Identity completed");
        Ok(())
    }

    /// Process `identities` one after another.
    pub async fn run(&self, identities: Vec<Identity>) -> RunSummary {
        let total = identities.len();
        let excluded = &self.services.config.excluded_wallets;
        let eligible = eligible_identities(identities, excluded, &mut rand::thread_rng());

        let mut summary = RunSummary {
            excluded: total - eligible.len(),
            ..RunSummary::default()
        };

        for (i, identity) in eligible.iter().enumerate() {
            match self.process_identity(identity).await {
                Ok(()) => {
                    summary.completed += 1;
                    metrics::record_identity("completed");
                }
                Err(e) => {
                    summary.failed += 1;
                    metrics::record_identity("failed");
                    tracing::error!(name = %identity.name, error = %e, "Identity failed");
                }
            }

            if i + 1 < eligible.len() {
                cooldown(&self.services.config.delays.wallet, "between wallets").await;
            }
        }

        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            excluded = summary.excluded,
            "Run finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WrapConfig, BridgeConfig, BridgeVenue};
    use crate::blockchain::tokens::AmountRange;

    fn modules() -> Vec<ModuleConfig> {
        vec![
            ModuleConfig::Wrap(WrapConfig {
                enabled: true,
                chain: Chain::Base,
                weth_address: alloy::primitives::Address::ZERO,
            }),
            ModuleConfig::Bridge(BridgeConfig {
                enabled: false,
                venue: BridgeVenue::XyFinance,
                from_chains: vec![Chain::Base],
                amount_range: AmountRange::new(0.003, 0.004),
                api_url: None,
            }),
            ModuleConfig::Wrap(WrapConfig {
                enabled: true,
                chain: Chain::Linea,
                weth_address: alloy::primitives::Address::ZERO,
            }),
        ]
    }

    fn chain_of(m: &ModuleConfig) -> Chain {
        match m {
            ModuleConfig::Wrap(w) => w.chain,
            _ => panic!("only wrap modules expected"),
        }
    }

    #[test]
    fn test_plan_default_keeps_order_and_drops_disabled() {
        let plan = plan_modules(&modules(), ModuleOrder::Default, &mut rand::thread_rng());
        let chains: Vec<Chain> = plan.iter().map(chain_of).collect();
        assert_eq!(chains, vec![Chain::Base, Chain::Linea]);
    }

    #[test]
    fn test_plan_random_and_one_random() {
        let mut rng = rand::thread_rng();
        assert_eq!(plan_modules(&modules(), ModuleOrder::Random, &mut rng).len(), 2);
        assert_eq!(plan_modules(&modules(), ModuleOrder::OneRandom, &mut rng).len(), 1);
        assert!(plan_modules(&[], ModuleOrder::OneRandom, &mut rng).is_empty());
    }

    #[test]
    fn test_eligible_identities_excludes_by_name() {
        let ids: Vec<Identity> = ["1", "2", "7"]
            .iter()
            .map(|n| Identity {
                name: n.to_string(),
                private_key: String::new(),
            })
            .collect();
        let excluded: BTreeSet<String> = ["2".to_string()].into_iter().collect();
        let eligible = eligible_identities(ids, &excluded, &mut rand::thread_rng());
        let mut names: Vec<&str> = eligible.iter().map(|i| i.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["1", "7"]);
    }

    #[test]
    fn test_identity_debug_hides_key() {
        let identity = Identity {
            name: "7".to_string(),
            private_key: "deadbeef".to_string(),
        };
        assert!(!format!("{:?}", identity).contains("deadbeef"));
    }
}
