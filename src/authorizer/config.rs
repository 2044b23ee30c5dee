use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::CommonConfig;

/// Authorizer decision configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthorizerConfig {
    /// Copy the verified token's scalar claims into the policy context, so
    /// they reach the backend integration. Default: false, the context stays
    /// empty.
    #[serde(default = "AuthorizerConfig::default_forward_claims")]
    pub forward_claims: bool,
}

impl CommonConfig for AuthorizerConfig {
    fn default() -> Self {
        Self {
            forward_claims: Self::default_forward_claims(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        Ok(())
    }
}

impl AuthorizerConfig {
    pub fn default_forward_claims() -> bool {
        false
    }
}
