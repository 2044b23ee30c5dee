use std::path::{Path, PathBuf};
use std::{env, fs, io};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::authorizer::config::AuthorizerConfig;
use crate::keys::config::KeysConfig;
use crate::logs::LogConfig;
use crate::token::config::VerifierConfig;

/// Environment variable consulted when no config path is given.
pub const CONFIG_ENV: &str = "JWT_AUTHORIZER_CONFIG";

pub trait CommonConfig {
    fn default() -> Self;
    fn complete(&mut self) -> Result<()>;
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "KeysConfig::default")]
    pub keys: KeysConfig,

    #[serde(default = "VerifierConfig::default")]
    pub verifier: VerifierConfig,

    #[serde(default = "AuthorizerConfig::default")]
    pub authorizer: AuthorizerConfig,

    #[serde(default = "LogConfig::default")]
    pub log: LogConfig,
}

impl CommonConfig for Config {
    fn default() -> Self {
        Self {
            keys: KeysConfig::default(),
            verifier: VerifierConfig::default(),
            authorizer: AuthorizerConfig::default(),
            log: LogConfig::default(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        self.keys.complete().context("validate keys config")?;
        self.verifier.complete().context("validate verifier config")?;
        self.authorizer.complete().context("validate authorizer config")?;
        self.log.complete().context("validate log config")?;
        Ok(())
    }
}

impl Config {
    /// Loads the config from `path`, falling back to `$JWT_AUTHORIZER_CONFIG`.
    /// A missing file yields the defaults, see [`Config::missing_file`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match Self::locate(path) {
            Some(path) => Self::read(&path)?,
            None => <Self as CommonConfig>::default(),
        };

        cfg.complete()?;
        Ok(cfg)
    }

    /// The config file that [`Config::load`] would read, if any.
    pub fn locate(path: Option<&Path>) -> Option<PathBuf> {
        match path {
            Some(path) => Some(PathBuf::from(path)),
            None => env::var_os(CONFIG_ENV).map(PathBuf::from),
        }
    }

    /// The located config file when it does not exist, so the caller can
    /// report that the defaults are in use once logging is set up.
    pub fn missing_file(path: Option<&Path>) -> Option<PathBuf> {
        Self::locate(path).filter(|path| !path.exists())
    }

    pub fn parse(s: &str) -> Result<Self> {
        let mut cfg: Self = toml::from_str(s).context("parse config toml")?;
        cfg.complete()?;
        Ok(cfg)
    }

    fn read(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s)
                .with_context(|| format!("parse config file '{}'", path.display())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Ok(<Self as CommonConfig>::default())
            }
            Err(err) => Err(err).with_context(|| format!("read config file '{}'", path.display())),
        }
    }
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.keys.timeout, 10);
        assert_eq!(cfg.keys.cache_ttl, 0);
        assert_eq!(cfg.keys.refresh_interval, 10);
        assert!(cfg.verifier.allowed_issuers.is_empty());
        assert_eq!(cfg.verifier.algorithms, vec!["RS256".to_string()]);
        assert!(!cfg.authorizer.forward_claims);
    }

    #[test]
    fn test_parse() {
        let cfg = Config::parse(
            r#"
            [keys]
            timeout = 3
            cache_ttl = 600
            refresh_interval = 30

            [verifier]
            allowed_issuers = ["https://login.example.com/tenant/v2.0"]
            audience = "api://orders"
            algorithms = ["RS256", "ES256"]
            leeway = 30

            [authorizer]
            forward_claims = true

            [log]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.keys.timeout, 3);
        assert_eq!(cfg.keys.cache_ttl, 600);
        assert_eq!(cfg.keys.refresh_interval, 30);
        assert_eq!(cfg.verifier.audience.as_deref(), Some("api://orders"));
        assert_eq!(cfg.verifier.algorithms.len(), 2);
        assert_eq!(cfg.verifier.leeway, 30);
        assert!(cfg.authorizer.forward_claims);
        assert_eq!(cfg.log.level, "debug");
    }

    #[test]
    fn test_invalid() {
        let cases = [
            "[keys]\ntimeout = 0",
            "[verifier]\nalgorithms = []",
            "[verifier]\nalgorithms = [\"HS256\"]",
            "[verifier]\nalgorithms = [\"XX999\"]",
            "[log]\nlevel = \"verbose\"",
        ];
        for case in cases {
            assert!(Config::parse(case).is_err(), "{case} should be rejected");
        }
    }

    #[test]
    fn test_expandenv() {
        env::set_var("JWT_AUTHORIZER_TEST_TENANT", "contoso");
        let cfg = Config::parse(
            r#"
            [verifier]
            allowed_issuers = ["https://login.example.com/${JWT_AUTHORIZER_TEST_TENANT}"]
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.verifier.allowed_issuers,
            vec!["https://login.example.com/contoso".to_string()]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let path = Path::new("/nonexistent/jwt-authorizer.toml");
        let cfg = Config::load(Some(path)).unwrap();
        assert_eq!(cfg.keys.timeout, 10);

        assert_eq!(Config::missing_file(Some(path)), Some(path.to_path_buf()));
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        assert_eq!(Config::missing_file(Some(manifest.as_path())), None);
    }
}
