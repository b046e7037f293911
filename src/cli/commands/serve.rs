use std::future::Future;

use anyhow::{Context, Result};
use clap::Args;

use crate::models::Config;
use crate::server;
use crate::services::RagPipeline;

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, short = 'b', help = "Address to listen on (overrides server.bind)")]
    pub bind: Option<String>,
}

pub async fn handle_serve<F>(args: ServeArgs, config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut server_config = config.server.clone();
    if let Some(bind) = args.bind {
        server_config.bind = bind;
    }

    let pipeline = RagPipeline::from_config(config).context("failed to initialize services")?;
    server::serve(pipeline, &server_config, shutdown)
        .await
        .with_context(|| format!("server on {} failed", server_config.bind))
}
