//! Stats command handler.
//!
//! Shows the size and settings of the vector collection.

use clap::Args;
use visionrag_core::{config::AppConfig, AppResult};
use visionrag_index::{DistanceMetric, SqliteVectorStore, VectorStore, VideoCatalog};

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let metric = DistanceMetric::parse(&config.store.metric)?;
        let store = SqliteVectorStore::open(&config.index_path(), &config.store.collection, metric)?;
        let stats = store.stats()?;
        let videos = VideoCatalog::open(&config.index_path())?.list()?.len();

        if self.json {
            return super::print_json(&serde_json::json!({
                "collectionName": stats.collection_name,
                "totalEntries": stats.total_entries,
                "metric": stats.metric,
                "dimension": stats.dimension,
                "videos": videos,
                "embeddingModel": config.ollama.embedding_model,
            }));
        }

        println!("Collection:      {}", stats.collection_name);
        println!("Entries:         {}", stats.total_entries);
        println!("Videos:          {}", videos);
        println!("Metric:          {}", stats.metric);
        match stats.dimension {
            Some(d) => println!("Dimension:       {}", d),
            None => println!("Dimension:       (empty)"),
        }
        println!("Embedding model: {}", config.ollama.embedding_model);

        Ok(())
    }
}
