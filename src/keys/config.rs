use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::CommonConfig;

/// Key discovery configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeysConfig {
    /// Timeout in seconds for each discovery or key set request.
    /// Default: 10. Must be greater than 0.
    #[serde(default = "KeysConfig::default_timeout")]
    pub timeout: u64,

    /// How long (seconds) a fetched key set may be reused for the same issuer.
    /// Default: 0, which disables caching so every request re-fetches the keys.
    #[serde(default = "KeysConfig::default_cache_ttl")]
    pub cache_ttl: u64,

    /// Minimum age (seconds) of a cached key set before a token with an
    /// unknown `kid` may force it to be fetched again. Default: 10. Only used
    /// when caching is enabled.
    #[serde(default = "KeysConfig::default_refresh_interval")]
    pub refresh_interval: u64,

    /// Skip TLS certificate validation when talking to the issuer. Only meant
    /// for local identity providers with self-signed certificates.
    #[serde(default = "KeysConfig::default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

impl CommonConfig for KeysConfig {
    fn default() -> Self {
        Self {
            timeout: Self::default_timeout(),
            cache_ttl: Self::default_cache_ttl(),
            refresh_interval: Self::default_refresh_interval(),
            accept_invalid_certs: Self::default_accept_invalid_certs(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        if self.timeout == 0 {
            bail!("keys timeout should not be 0");
        }
        Ok(())
    }
}

impl KeysConfig {
    pub fn default_timeout() -> u64 {
        10
    }

    pub fn default_cache_ttl() -> u64 {
        0
    }

    pub fn default_refresh_interval() -> u64 {
        10
    }

    pub fn default_accept_invalid_certs() -> bool {
        false
    }
}
