use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::{OutputFormat, QueryResults, get_formatter};
use crate::models::Config;
use crate::services::RagPipeline;

use super::train::require_persistent_store;

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(required = true, help = "Dataset name")]
    pub dataset: String,

    #[arg(required = true, help = "Query text")]
    pub text: String,

    #[arg(long, short = 'k', help = "Number of chunks to return")]
    pub top_k: Option<u64>,
}

pub async fn handle_query(
    args: QueryArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let query = args.text.trim();
    if query.is_empty() {
        anyhow::bail!("query cannot be empty");
    }
    if args.top_k == Some(0) {
        anyhow::bail!("top-k must be at least 1");
    }
    require_persistent_store(config, "query")?;

    let formatter = get_formatter(format);
    let pipeline = RagPipeline::from_config(config).context("failed to initialize services")?;

    if verbose {
        eprintln!("Query: \"{query}\"");
        eprintln!("  Dataset: {}", args.dataset);
        if let Some(k) = args.top_k {
            eprintln!("  Top k: {k}");
        }
    }

    let start_time = Instant::now();
    let hits = pipeline
        .query(&args.dataset, query, args.top_k)
        .await
        .context("query failed")?;

    let results = QueryResults {
        dataset: args.dataset,
        query: query.to_string(),
        hits,
        duration_ms: start_time.elapsed().as_millis() as u64,
    };
    print!("{}", formatter.format_query_results(&results));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VectorDriver;

    fn args(text: &str, top_k: Option<u64>) -> QueryArgs {
        QueryArgs {
            dataset: "notes".to_string(),
            text: text.to_string(),
            top_k,
        }
    }

    #[tokio::test]
    async fn test_query_rejects_memory_driver() {
        let mut config = Config::default();
        config.vector_store.driver = VectorDriver::Memory;

        let err = handle_query(args("crab", None), &config, OutputFormat::Json, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("`query` needs a persistent vector store"));
    }

    #[tokio::test]
    async fn test_query_rejects_bad_arguments() {
        let config = Config::default();

        let err = handle_query(args("   ", None), &config, OutputFormat::Json, false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "query cannot be empty");

        let err = handle_query(args("crab", Some(0)), &config, OutputFormat::Json, false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "top-k must be at least 1");
    }
}
