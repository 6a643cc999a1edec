//! Gated HTTP transport for one identity.
//!
//! # Responsibilities
//! - Bind every outbound call of an identity to its proxy
//! - Verify the proxy is alive and actually hides the direct address
//! - Refuse all transport before initialization succeeds

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::config::{ProxyHandle, ProxySettings};
use crate::net::fingerprint::Fingerprint;

/// Relay failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Network relay used before initialization")]
    RelayNotInitialized,

    #[error("Network relay already initialized for this identity")]
    AlreadyInitialized,

    #[error("A proxy is required but none was assigned")]
    ProxyRequired,

    #[error("Proxy does not hide the direct address ({ip})")]
    ProxyIneffective { ip: String },

    #[error("IP lookup failed: {0}")]
    IpLookup(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

#[derive(Debug, Deserialize)]
struct IpEcho {
    ip: String,
}

#[derive(Debug)]
struct Bound {
    client: reqwest::Client,
    fingerprint: Fingerprint,
    proxied: bool,
}

/// Per-identity transport gate.
#[derive(Debug)]
pub struct NetworkRelay {
    settings: ProxySettings,
    bound: Option<Bound>,
}

impl NetworkRelay {
    pub fn new(settings: ProxySettings) -> Self {
        Self {
            settings,
            bound: None,
        }
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }

    pub fn is_initialized(&self) -> bool {
        self.bound.is_some()
    }

    /// Bind this relay to `proxy` and verify it.
    ///
    /// Returns the exit IP observed through the proxy, or `None` when
    /// running direct.
    pub async fn initialize(&mut self, proxy: Option<&ProxyHandle>) -> Result<Option<String>, RelayError> {
        if self.bound.is_some() {
            return Err(RelayError::AlreadyInitialized);
        }

        let fingerprint = Fingerprint::random(&mut rand::thread_rng());
        let timeout = Duration::from_secs(self.settings.timeout_secs);

        let Some(proxy) = proxy else {
            if self.settings.enforce || self.settings.rpc_requests {
                return Err(RelayError::ProxyRequired);
            }
            let client = build_client(&fingerprint, None, timeout)?;
            tracing::info!(user_agent = fingerprint.user_agent, "Relay running without proxy");
            self.bound = Some(Bound {
                client,
                fingerprint,
                proxied: false,
            });
            return Ok(None);
        };

        let client = build_client(&fingerprint, Some(proxy), timeout)?;
        let proxied_ip = lookup_ip(&client, &self.settings.ip_echo_url).await?;

        if self.settings.enforce {
            let direct = build_client(&fingerprint, None, timeout)?;
            let direct_ip = lookup_ip(&direct, &self.settings.ip_echo_url).await?;
            check_anonymity(&direct_ip, &proxied_ip)?;
        }

        tracing::info!(
            proxy = %proxy.host,
            exit_ip = %proxied_ip,
            user_agent = fingerprint.user_agent,
            "Relay bound to proxy"
        );

        self.bound = Some(Bound {
            client,
            fingerprint,
            proxied: true,
        });
        Ok(Some(proxied_ip))
    }

    /// Client for generic HTTP calls (quote APIs and similar).
    pub fn http(&self) -> Result<&reqwest::Client, RelayError> {
        self.bound
            .as_ref()
            .map(|b| &b.client)
            .ok_or(RelayError::RelayNotInitialized)
    }

    /// Client chain RPC should use, or `None` for a direct connection.
    pub fn rpc_transport(&self) -> Result<Option<reqwest::Client>, RelayError> {
        let bound = self.bound.as_ref().ok_or(RelayError::RelayNotInitialized)?;
        if bound.proxied && self.settings.rpc_requests {
            Ok(Some(bound.client.clone()))
        } else {
            Ok(None)
        }
    }

    pub fn user_agent(&self) -> Result<&'static str, RelayError> {
        self.bound
            .as_ref()
            .map(|b| b.fingerprint.user_agent)
            .ok_or(RelayError::RelayNotInitialized)
    }
}

/// Fails when the proxy exposes the same address as a direct call.
pub fn check_anonymity(direct_ip: &str, proxied_ip: &str) -> Result<(), RelayError> {
    if direct_ip.trim() == proxied_ip.trim() {
        return Err(RelayError::ProxyIneffective {
            ip: proxied_ip.trim().to_string(),
        });
    }
    Ok(())
}

fn build_client(
    fingerprint: &Fingerprint,
    proxy: Option<&ProxyHandle>,
    timeout: Duration,
) -> Result<reqwest::Client, RelayError> {
    let builder = reqwest::Client::builder()
        .default_headers(fingerprint.headers())
        .timeout(timeout);

    let builder = match proxy {
        Some(handle) => {
            let mut p = reqwest::Proxy::all(handle.url()).map_err(|e| RelayError::Client(e.to_string()))?;
            if let Some(user) = &handle.username {
                p = p.basic_auth(user, handle.password.as_deref().unwrap_or(""));
            }
            builder.proxy(p)
        }
        None => builder.no_proxy(),
    };

    builder.build().map_err(|e| RelayError::Client(e.to_string()))
}

async fn lookup_ip(client: &reqwest::Client, url: &str) -> Result<String, RelayError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| RelayError::IpLookup(e.to_string()))?;
    let echo: IpEcho = response
        .error_for_status()
        .map_err(|e| RelayError::IpLookup(e.to_string()))?
        .json()
        .await
        .map_err(|e| RelayError::IpLookup(e.to_string()))?;
    Ok(echo.ip)
}
