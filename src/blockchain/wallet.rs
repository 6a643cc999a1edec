//! Wallet session for the identity currently being processed.
//!
//! # Security
//! - Private keys are never logged or serialized
//! - One session per identity; a new identity gets a new session value

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::chains::Chain;

/// Key material handed to [`WalletSession::init`].
pub enum SigningKey {
    /// Hex-encoded private key, with or without `0x`.
    Hex(String),
    /// An already decrypted signer.
    Signer(PrivateKeySigner),
}

impl From<PrivateKeySigner> for SigningKey {
    fn from(signer: PrivateKeySigner) -> Self {
        SigningKey::Signer(signer)
    }
}

impl From<&str> for SigningKey {
    fn from(key: &str) -> Self {
        SigningKey::Hex(key.to_string())
    }
}

/// Active identity: display name, signer and derived address.
#[derive(Debug, Clone)]
pub struct WalletSession {
    name: String,
    signer: PrivateKeySigner,
    address: Address,
    chain: Chain,
    numeric_id: u64,
}

impl WalletSession {
    /// Bind a signing key to the settlement chain.
    ///
    /// # Arguments
    /// * `key` - Private key or ready signer
    /// * `name` - Display name used in logs and the processed record
    /// * `settlement_id` - Numeric id of [`Chain::SETTLEMENT`] (EIP-155)
    pub fn init(key: impl Into<SigningKey>, name: &str, settlement_id: u64) -> BlockchainResult<Self> {
        let signer = match key.into() {
            SigningKey::Hex(hex) => parse_private_key(&hex)?,
            SigningKey::Signer(signer) => signer,
        }
        .with_chain_id(Some(settlement_id));

        let address = signer.address();

        tracing::info!(
            name = name,
            address = %address,
            chain = %Chain::SETTLEMENT,
            "Wallet session initialized"
        );

        Ok(Self {
            name: name.to_string(),
            signer,
            address,
            chain: Chain::SETTLEMENT,
            numeric_id: settlement_id,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// The settlement chain the signer is bound to.
    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn chain_id(&self) -> u64 {
        self.numeric_id
    }
}

fn parse_private_key(private_key_hex: &str) -> BlockchainResult<PrivateKeySigner> {
    let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
    key_hex
        .parse()
        .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_session_from_private_key() {
        let session = WalletSession::init(TEST_PRIVATE_KEY, "7", 1101).unwrap();
        assert_eq!(
            session.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert_eq!(session.name(), "7");
        assert_eq!(session.chain(), Chain::Zkevm);
        assert_eq!(session.signer().chain_id(), Some(1101));
    }

    #[test]
    fn test_session_with_0x_prefix() {
        let session = WalletSession::init(format!("0x{}", TEST_PRIVATE_KEY).as_str(), "1", 1101).unwrap();
        assert_eq!(
            session.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_session_from_signer() {
        let signer: PrivateKeySigner = TEST_PRIVATE_KEY.parse().unwrap();
        let expected = signer.address();
        let session = WalletSession::init(signer, "2", 1101).unwrap();
        assert_eq!(session.address(), expected);
    }

    #[test]
    fn test_reinit_replaces_identity() {
        let first = WalletSession::init(TEST_PRIVATE_KEY, "1", 1101).unwrap();
        let second = WalletSession::init(PrivateKeySigner::random(), "2", 1101).unwrap();
        assert_ne!(first.address(), second.address());
        assert_eq!(second.name(), "2");
    }

    #[test]
    fn test_invalid_private_key() {
        let result = WalletSession::init("invalid_key", "x", 1101);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }
}
