use std::str::FromStr;

use anyhow::{bail, Context, Result};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig};

/// Token verification configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VerifierConfig {
    /// Issuers whose tokens are accepted. Values may reference environment
    /// variables. Empty (the default) accepts any issuer that publishes a
    /// discovery document.
    #[serde(default = "VerifierConfig::default_allowed_issuers")]
    pub allowed_issuers: Vec<String>,

    /// Required `aud` claim. When unset the audience is not checked.
    #[serde(default)]
    pub audience: Option<String>,

    /// Accepted JWS algorithms. Default: ["RS256"]. Only asymmetric
    /// algorithms are allowed.
    #[serde(default = "VerifierConfig::default_algorithms")]
    pub algorithms: Vec<String>,

    /// Clock skew tolerance in seconds for `exp` and `nbf`. Default: 0.
    #[serde(default = "VerifierConfig::default_leeway")]
    pub leeway: u64,
}

impl CommonConfig for VerifierConfig {
    fn default() -> Self {
        Self {
            allowed_issuers: Self::default_allowed_issuers(),
            audience: None,
            algorithms: Self::default_algorithms(),
            leeway: Self::default_leeway(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        let mut issuers = Vec::with_capacity(self.allowed_issuers.len());
        for issuer in self.allowed_issuers.iter() {
            let issuer = expandenv("allowed_issuers", issuer)?;
            if issuer.is_empty() {
                bail!("allowed_issuers should not contain empty issuer");
            }
            issuers.push(issuer);
        }
        self.allowed_issuers = issuers;

        if let Some(audience) = self.audience.as_ref() {
            self.audience = Some(expandenv("audience", audience)?);
        }

        self.parse_algorithms()?;
        Ok(())
    }
}

impl VerifierConfig {
    pub fn default_allowed_issuers() -> Vec<String> {
        vec![]
    }

    pub fn default_algorithms() -> Vec<String> {
        vec![String::from("RS256")]
    }

    pub fn default_leeway() -> u64 {
        0
    }

    pub fn parse_algorithms(&self) -> Result<Vec<Algorithm>> {
        if self.algorithms.is_empty() {
            bail!("algorithms should not be empty");
        }

        let mut algorithms = Vec::with_capacity(self.algorithms.len());
        for name in self.algorithms.iter() {
            let alg = Algorithm::from_str(name)
                .with_context(|| format!("unknown algorithm '{name}'"))?;
            if matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
                bail!("symmetric algorithm '{name}' is not supported");
            }
            algorithms.push(alg);
        }

        Ok(algorithms)
    }
}
