pub mod cache;
pub mod config;
pub mod fetch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey};
use log::debug;
use openssl::x509::X509;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AuthorizeError;

use cache::KeyCache;
use fetch::JsonFetcher;

/// Path appended to the issuer to locate its OpenID Connect discovery document.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

pub fn discovery_url(issuer: &str) -> String {
    format!("{}{DISCOVERY_PATH}", issuer.trim_end_matches('/'))
}

/// One entry of an issuer's JWKS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SigningKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Base64url SHA-1 thumbprint of the certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,

    /// Certificate chain, base64 (not url-safe) DER, leaf first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x5c: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

impl SigningKey {
    /// The identifier matched against a token's `kid`: the key's own `kid`,
    /// or its certificate thumbprint when the issuer publishes none.
    pub fn id(&self) -> Option<&str> {
        self.kid.as_deref().or(self.x5t.as_deref())
    }

    /// The public key of the leaf certificate, as a PEM SubjectPublicKeyInfo.
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        let cert = match self.x5c.first() {
            Some(cert) => cert,
            None => bail!("key has no x5c certificate"),
        };

        let der = STANDARD
            .decode(cert.trim())
            .context("decode x5c certificate base64")?;
        let cert = X509::from_der(&der).context("parse x5c certificate")?;
        let public_key = cert
            .public_key()
            .context("extract public key from certificate")?;

        public_key
            .public_key_to_pem()
            .context("encode public key to pem")
    }

    pub fn decoding_key(&self, alg: Algorithm) -> Result<DecodingKey> {
        if !self.x5c.is_empty() {
            let pem = self.to_pem()?;
            let key = match alg {
                Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512 => DecodingKey::from_rsa_pem(&pem),
                Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(&pem),
                Algorithm::EdDSA => DecodingKey::from_ed_pem(&pem),
                Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                    bail!("symmetric algorithm {alg:?} cannot use a published key")
                }
            };
            return key.with_context(|| format!("load {alg:?} public key from certificate"));
        }

        match self.kty.as_deref() {
            Some("RSA") => match (self.n.as_deref(), self.e.as_deref()) {
                (Some(n), Some(e)) => {
                    DecodingKey::from_rsa_components(n, e).context("load RSA key components")
                }
                _ => bail!("RSA key without certificate needs both 'n' and 'e'"),
            },
            Some("EC") => match (self.x.as_deref(), self.y.as_deref()) {
                (Some(x), Some(y)) => {
                    DecodingKey::from_ec_components(x, y).context("load EC key components")
                }
                _ => bail!("EC key without certificate needs both 'x' and 'y'"),
            },
            kty => bail!("unsupported key type {kty:?} without x5c certificate"),
        }
    }
}

/// The keys published at `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    pub url: String,
    pub keys: Vec<SigningKey>,
}

#[derive(Debug, Clone)]
pub struct ResolvedKeys {
    pub key_set: Arc<KeySet>,
    /// Whether the keys were served from the cache rather than fetched.
    pub from_cache: bool,
}

#[derive(Deserialize)]
struct DiscoveryDocument {
    #[serde(default)]
    jwks_uri: Option<String>,
}

#[derive(Deserialize)]
struct JwksDocument {
    #[serde(default)]
    keys: Vec<SigningKey>,
}

/// Finds an issuer's signing keys through OpenID Connect discovery.
pub struct KeyResolver<F: JsonFetcher> {
    fetcher: F,
    cache: Option<KeyCache>,
    refresh_interval: Duration,
}

impl<F: JsonFetcher> KeyResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cache: None,
            refresh_interval: Duration::ZERO,
        }
    }

    /// Minimum age of a cached key set before [`KeyResolver::refresh_stale`]
    /// fetches it again.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(KeyCache::new(ttl));
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn resolve(&self, issuer: &str) -> Result<ResolvedKeys, AuthorizeError> {
        if let Some(cache) = self.cache.as_ref() {
            if let Some(key_set) = cache.get(issuer).await {
                debug!("Use cached key set for issuer '{issuer}'");
                return Ok(ResolvedKeys {
                    key_set,
                    from_cache: true,
                });
            }
        }

        let key_set = self.refresh(issuer).await?;
        Ok(ResolvedKeys {
            key_set,
            from_cache: false,
        })
    }

    /// Fetches the key set even if a cached copy exists, and replaces the
    /// cached copy.
    pub async fn refresh(&self, issuer: &str) -> Result<Arc<KeySet>, AuthorizeError> {
        let jwks_uri = self.discover(issuer).await?;
        let key_set = Arc::new(self.fetch_keys(&jwks_uri).await?);

        if let Some(cache) = self.cache.as_ref() {
            cache.save(issuer, key_set.clone()).await;
        }

        Ok(key_set)
    }

    /// Refreshes the issuer's key set unless the cached copy was fetched less
    /// than the refresh interval ago, in which case `None` is returned.
    pub async fn refresh_stale(&self, issuer: &str) -> Result<Option<Arc<KeySet>>, AuthorizeError> {
        if let Some(cache) = self.cache.as_ref() {
            if let Some(age) = cache.age(issuer).await {
                if age < self.refresh_interval {
                    debug!("Key set of '{issuer}' fetched {age:?} ago, skip refresh");
                    return Ok(None);
                }
            }
        }

        self.refresh(issuer).await.map(Some)
    }

    /// Returns the `jwks_uri` advertised by the issuer.
    pub async fn discover(&self, issuer: &str) -> Result<String, AuthorizeError> {
        let url = discovery_url(issuer);
        let discovery_error = |reason: String| AuthorizeError::Discovery {
            url: url.clone(),
            reason,
        };

        let value = self
            .fetcher
            .fetch_json(&url)
            .await
            .map_err(|e| discovery_error(format!("{e:#}")))?;
        if value.is_null() {
            return Err(discovery_error(String::from("empty response")));
        }

        let doc: DiscoveryDocument =
            serde_json::from_value(value).map_err(|e| discovery_error(e.to_string()))?;
        match doc.jwks_uri {
            Some(uri) if !uri.is_empty() => Ok(uri),
            _ => Err(discovery_error(String::from("missing jwks_uri"))),
        }
    }

    pub async fn fetch_keys(&self, jwks_uri: &str) -> Result<KeySet, AuthorizeError> {
        let key_set_error = |reason: String| AuthorizeError::KeySet {
            url: jwks_uri.to_string(),
            reason,
        };

        let value = self
            .fetcher
            .fetch_json(jwks_uri)
            .await
            .map_err(|e| key_set_error(format!("{e:#}")))?;

        let doc: JwksDocument = match value {
            Value::Null => return Err(key_set_error(String::from("empty response"))),
            value => serde_json::from_value(value).map_err(|e| key_set_error(e.to_string()))?,
        };
        if doc.keys.is_empty() {
            return Err(key_set_error(String::from("no keys")));
        }

        debug!("Fetched {} keys from '{jwks_uri}'", doc.keys.len());
        Ok(KeySet {
            url: jwks_uri.to_string(),
            keys: doc.keys,
        })
    }
}
