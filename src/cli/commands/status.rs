use anyhow::Result;

use crate::cli::output::{OutputFormat, StatusInfo, get_formatter};
use crate::models::{Config, VectorDriver};
use crate::services::create_vector_store;

pub async fn handle_status(config: &Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    let (connected, datasets) = match create_vector_store(&config.vector_store) {
        Ok(store) => {
            let connected = store.health_check().await.unwrap_or(false);
            let datasets = if connected {
                store.list_collections().await.unwrap_or_default()
            } else {
                Vec::new()
            };
            (connected, datasets)
        }
        Err(e) => {
            tracing::debug!("vector store unavailable: {e}");
            (false, Vec::new())
        }
    };

    let status = StatusInfo {
        vector_store_driver: config.vector_store.driver.to_string(),
        vector_store_url: config.vector_store.url.clone(),
        vector_store_connected: connected,
        datasets,
        datasets_dir: config.datasets.dir.display().to_string(),
        embedding_model: config.embedding.model_id.clone(),
    };

    print!("{}", formatter.format_status(&status));

    if !connected && config.vector_store.driver == VectorDriver::Qdrant {
        eprintln!();
        eprintln!("Warning: Qdrant not reachable. Start with: docker compose up -d qdrant");
    }

    Ok(())
}
