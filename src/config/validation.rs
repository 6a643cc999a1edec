//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (delays ordered, timeouts > 0, amounts positive)
//! - Check chain references and URLs
//!
//! Returns all validation errors, not just the first.

use std::fmt;

use crate::blockchain::tokens::AmountRange;
use crate::chains::Chain;
use crate::config::schema::{AppConfig, DelayRange, ModuleConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_delay(errors: &mut Vec<ValidationError>, field: &str, range: &DelayRange) {
    if range.min_secs > range.max_secs {
        errors.push(ValidationError::new(field, "min_secs must not exceed max_secs"));
    }
}

fn check_amount(errors: &mut Vec<ValidationError>, field: &str, range: &AmountRange) {
    if !(range.min.is_finite() && range.max.is_finite()) || range.min <= 0.0 {
        errors.push(ValidationError::new(field, "amounts must be positive numbers"));
    } else if range.min > range.max {
        errors.push(ValidationError::new(field, "min must not exceed max"));
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_delay(&mut errors, "delays.wallet", &config.delays.wallet);
    check_delay(&mut errors, "delays.module", &config.delays.module);
    check_delay(&mut errors, "delays.tx_cooldown", &config.delays.tx_cooldown);
    check_delay(&mut errors, "delays.secondary_act", &config.delays.secondary_act);

    if config.confirmation.confirmations == 0 {
        errors.push(ValidationError::new("confirmation.confirmations", "must be at least 1"));
    }
    if config.confirmation.timeout_secs == 0 {
        errors.push(ValidationError::new("confirmation.timeout_secs", "must be greater than 0"));
    }
    if config.rpc.timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.timeout_secs", "must be greater than 0"));
    }
    if config.gas.floor_gwei == 0 {
        errors.push(ValidationError::new("gas.floor_gwei", "must be greater than 0"));
    }
    if url::Url::parse(&config.proxy.ip_echo_url).is_err() {
        errors.push(ValidationError::new("proxy.ip_echo_url", "not a valid URL"));
    }

    for (chain, rpc) in &config.chains {
        if url::Url::parse(rpc).is_err() {
            errors.push(ValidationError::new(format!("chains.{}", chain), "not a valid URL"));
        }
    }

    for (i, module) in config.modules.iter().enumerate() {
        let field = format!("modules[{}]", i);
        let api_url = match module {
            ModuleConfig::Swap(swap) => swap.api_url.as_deref(),
            ModuleConfig::Bridge(bridge) => bridge.api_url.as_deref(),
            ModuleConfig::Wrap(_) => None,
        };
        if api_url.is_some_and(|u| url::Url::parse(u).is_err()) {
            errors.push(ValidationError::new(format!("{}.api_url", field), "not a valid URL"));
        }
        match module {
            ModuleConfig::Swap(swap) => {
                if let Some(range) = &swap.amount_range {
                    check_amount(&mut errors, &format!("{}.amount_range", field), range);
                }
            }
            ModuleConfig::Bridge(bridge) => {
                check_amount(&mut errors, &format!("{}.amount_range", field), &bridge.amount_range);
                if bridge.from_chains.is_empty() {
                    errors.push(ValidationError::new(format!("{}.from_chains", field), "must not be empty"));
                }
                if bridge.from_chains.contains(&Chain::SETTLEMENT) {
                    errors.push(ValidationError::new(
                        format!("{}.from_chains", field),
                        "must not contain the settlement chain",
                    ));
                }
            }
            ModuleConfig::Wrap(_) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
