use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use serde::Serialize;

use jwt_authorizer::factory::AuthorizerFactory;
use jwt_authorizer::keys::SigningKey;

use super::{display_json, ConfigArgs, RunCommand};

/// Discover an issuer and list its published signing keys.
#[derive(Args)]
pub struct KeysArgs {
    /// Issuer url, as found in the token's `iss` claim.
    pub issuer: String,
}

#[derive(Serialize)]
struct KeySetInfo<'a> {
    url: &'a str,
    keys: Vec<KeyInfo<'a>>,
}

#[derive(Serialize)]
struct KeyInfo<'a> {
    id: Option<&'a str>,
    kty: Option<&'a str>,
    alg: Option<&'a str>,
    #[serde(rename = "use")]
    key_use: Option<&'a str>,
    certificate: bool,
}

impl<'a> From<&'a SigningKey> for KeyInfo<'a> {
    fn from(key: &'a SigningKey) -> Self {
        Self {
            id: key.id(),
            kty: key.kty.as_deref(),
            alg: key.alg.as_deref(),
            key_use: key.key_use.as_deref(),
            certificate: !key.x5c.is_empty(),
        }
    }
}

#[async_trait]
impl RunCommand for KeysArgs {
    async fn run(&self, config: &ConfigArgs) -> Result<()> {
        let cfg = config.init()?;
        let resolver = AuthorizerFactory::new(&cfg).build_resolver()?;

        let key_set = resolver.refresh(&self.issuer).await?;
        display_json(KeySetInfo {
            url: &key_set.url,
            keys: key_set.keys.iter().map(KeyInfo::from).collect(),
        })
    }
}
