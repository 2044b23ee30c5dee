use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;

use jwt_authorizer::factory::AuthorizerFactory;

use super::{display_json, ConfigArgs, RunCommand};

/// Evaluate one authorizer event and print the decision document.
#[derive(Args)]
pub struct AuthorizeArgs {
    /// File holding the JSON event. Read from stdin when omitted or "-".
    pub file: Option<PathBuf>,
}

#[async_trait]
impl RunCommand for AuthorizeArgs {
    async fn run(&self, config: &ConfigArgs) -> Result<()> {
        let cfg = config.init()?;
        let event = self.read_event()?;

        let authorizer = AuthorizerFactory::new(&cfg).build_authorizer()?;
        let doc = authorizer.authorize_event(&event).await?;
        display_json(doc)
    }
}

impl AuthorizeArgs {
    fn read_event(&self) -> Result<Vec<u8>> {
        match self.file.as_ref() {
            Some(path) if path.as_os_str() != "-" => std::fs::read(path)
                .with_context(|| format!("read event file '{}'", path.display())),
            _ => {
                let mut data = Vec::new();
                io::stdin()
                    .read_to_end(&mut data)
                    .context("read event from stdin")?;
                Ok(data)
            }
        }
    }
}
