mod authorize;
mod config;
mod keys;

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use log::warn;
use serde::Serialize;

use jwt_authorizer::config::{CommonConfig, Config};
use jwt_authorizer::logs;

#[async_trait]
pub trait RunCommand {
    async fn run(&self, config: &ConfigArgs) -> Result<()>;
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path of the config file. Defaults to `$JWT_AUTHORIZER_CONFIG`, without
    /// it the built-in defaults are used.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Override the log level of the config file, one of error, warn, info
    /// or debug.
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

impl ConfigArgs {
    fn load_config(&self) -> Result<Config> {
        let mut cfg = Config::load(self.config.as_deref())?;
        if let Some(level) = self.log_level.as_ref() {
            cfg.log.level = level.clone();
            cfg.log.complete().context("validate --log-level")?;
        }
        Ok(cfg)
    }

    /// Loads the config and installs the logger.
    pub fn init(&self) -> Result<Config> {
        let cfg = self.load_config()?;
        logs::init(&cfg.log.level)?;
        if let Some(path) = Config::missing_file(self.config.as_deref()) {
            warn!("Config file '{}' not found, using defaults", path.display());
        }
        Ok(cfg)
    }
}

#[derive(Parser)]
#[command(author, version, about)]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    Authorize(authorize::AuthorizeArgs),
    Config(config::ShowConfigArgs),
    Keys(keys::KeysArgs),
}

impl App {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Authorize(args) => args.run(&self.config).await,
            Commands::Config(args) => args.run(&self.config).await,
            Commands::Keys(args) => args.run(&self.config).await,
        }
    }
}

pub fn display_json<T: Serialize>(o: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&o)?);
    Ok(())
}
