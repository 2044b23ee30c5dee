use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Url;
use serde_json::Value;

use super::config::KeysConfig;

/// Fetches a JSON document. An empty body yields [`Value::Null`].
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &KeysConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout))
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let parsed = match Url::parse(url) {
            Ok(url) => url,
            Err(_) => bail!("invalid url '{url}'"),
        };
        match parsed.scheme() {
            "http" | "https" => {}
            _ => bail!(
                "invalid url scheme, expect 'http' or 'https', not '{}'",
                parsed.scheme()
            ),
        }

        debug!("GET {url}");
        let resp = self
            .client
            .get(parsed)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("request '{url}'"))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("request '{url}' failed with status {status}");
        }

        let body = resp.bytes().await.context("read response body")?;
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body).with_context(|| format!("decode json from '{url}'"))
    }
}
