use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;

use crate::authorizer::Authorizer;
use crate::config::Config;
use crate::keys::fetch::HttpFetcher;
use crate::keys::KeyResolver;
use crate::token::TokenVerifier;

pub struct AuthorizerFactory<'a> {
    cfg: &'a Config,
}

impl<'a> AuthorizerFactory<'a> {
    pub fn new(cfg: &'a Config) -> Self {
        Self { cfg }
    }

    pub fn build_resolver(&self) -> Result<KeyResolver<HttpFetcher>> {
        let fetcher = HttpFetcher::new(&self.cfg.keys).context("init http fetcher")?;
        let resolver = KeyResolver::new(fetcher);
        if self.cfg.keys.cache_ttl == 0 {
            debug!("Key set cache is disabled");
            return Ok(resolver);
        }

        debug!("Cache key sets for {}s", self.cfg.keys.cache_ttl);
        Ok(resolver
            .with_cache(Duration::from_secs(self.cfg.keys.cache_ttl))
            .with_refresh_interval(Duration::from_secs(self.cfg.keys.refresh_interval)))
    }

    pub fn build_authorizer(&self) -> Result<Authorizer<HttpFetcher>> {
        let resolver = self.build_resolver()?;
        let verifier = TokenVerifier::new(&self.cfg.verifier).context("init token verifier")?;
        Ok(Authorizer::new(resolver, verifier).with_forward_claims(self.cfg.authorizer.forward_claims))
    }
}
