use std::io::{self, IsTerminal};

use anyhow::{bail, Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::config::CommonConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogConfig {
    /// One of "error", "warn", "info" or "debug". Default: "info".
    #[serde(default = "LogConfig::default_level")]
    pub level: String,
}

impl CommonConfig for LogConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        parse_level(&self.level)?;
        Ok(())
    }
}

impl LogConfig {
    pub fn default_level() -> String {
        String::from("info")
    }
}

fn parse_level(level: &str) -> Result<LevelFilter> {
    let level = match level {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        _ => bail!("unknown log level '{}'", level),
    };
    Ok(level)
}

/// Logs go to stderr, stdout is reserved for the decision document.
pub fn init(level: &str) -> Result<()> {
    let level = parse_level(level)?;

    let is_terminal = io::stderr().is_terminal();

    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .debug(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            if is_terminal {
                out.finish(format_args!(
                    "{} [{}] {}",
                    humantime::format_rfc3339_millis(std::time::SystemTime::now()),
                    colors.color(record.level()),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "{} [{}] {}",
                    humantime::format_rfc3339_millis(std::time::SystemTime::now()),
                    record.level(),
                    message
                ))
            }
        })
        .level(level)
        .chain(io::stderr())
        .apply()
        .context("init logger")?;

    Ok(())
}
