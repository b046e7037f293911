use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::{OutputFormat, get_formatter};
use crate::models::{Config, VectorDriver};
use crate::services::RagPipeline;

#[derive(Debug, Args)]
pub struct TrainArgs {
    #[arg(required = true, help = "Dataset name (a directory under datasets.dir)")]
    pub dataset: String,
}

/// The memory store lives only as long as the process, so a one-shot
/// `train` or `query` against it can never see the other's points.
pub(super) fn require_persistent_store(config: &Config, command: &str) -> Result<()> {
    if config.vector_store.driver == VectorDriver::Memory {
        anyhow::bail!(
            "`{command}` needs a persistent vector store but vector_store.driver is \"memory\"; \
             use the qdrant driver or run `lantros serve` and call the HTTP API"
        );
    }
    Ok(())
}

fn spinner(format: OutputFormat) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

pub async fn handle_train(args: TrainArgs, config: &Config, format: OutputFormat) -> Result<()> {
    require_persistent_store(config, "train")?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let pb = spinner(format);
    pb.set_message("Loading embedding model...");
    let pipeline = RagPipeline::from_config(config).context("failed to initialize services")?;

    pb.set_message(format!("Training {}...", args.dataset));
    let result = pipeline.train(&args.dataset).await;
    pb.finish_and_clear();

    let report = result.with_context(|| format!("training {} failed", args.dataset))?;
    let duration_ms = start_time.elapsed().as_millis() as u64;
    print!(
        "{}",
        formatter.format_train_report(&args.dataset, &report, duration_ms)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_driver_is_rejected() {
        let mut config = Config::default();
        config.vector_store.driver = VectorDriver::Memory;

        let err = require_persistent_store(&config, "train").unwrap_err();
        assert!(err.to_string().contains("`train` needs a persistent vector store"));
        assert!(err.to_string().contains("lantros serve"));
    }

    #[test]
    fn test_qdrant_driver_is_accepted() {
        let config = Config::default();
        assert_eq!(config.vector_store.driver, VectorDriver::Qdrant);
        assert!(require_persistent_store(&config, "query").is_ok());
    }

    #[tokio::test]
    async fn test_train_with_memory_driver_fails_before_loading_models() {
        let mut config = Config::default();
        config.vector_store.driver = VectorDriver::Memory;
        config.embedding.model_path = Some("/nonexistent/model".into());

        let args = TrainArgs {
            dataset: "notes".to_string(),
        };
        let err = handle_train(args, &config, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("persistent vector store"));
    }
}
