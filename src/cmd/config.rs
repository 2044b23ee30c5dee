use anyhow::Result;
use async_trait::async_trait;
use clap::Args;

use super::{display_json, ConfigArgs, RunCommand};

/// Display the effective configuration in JSON format.
#[derive(Args)]
pub struct ShowConfigArgs {}

#[async_trait]
impl RunCommand for ShowConfigArgs {
    async fn run(&self, config: &ConfigArgs) -> Result<()> {
        let cfg = config.init()?;
        display_json(cfg)
    }
}
