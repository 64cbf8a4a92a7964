//! `askdoc ask`: one-shot question answering from the command line.
//!
//! Also home to [`load_service`], the startup sequence shared with the HTTP
//! server, so both surfaces answer through the same [`QueryService`].

use anyhow::{Context, Result};
use std::sync::Arc;

use askdoc_core::service::QueryService;

use crate::config::Config;
use crate::embedding;
use crate::qa;
use crate::snapshot::load_store;

/// Load the snapshot and models, and assemble the query service.
///
/// Fails if the snapshot is missing or invalid, the embedding provider
/// cannot be created, or its dimension does not match the snapshot. An
/// unavailable answer extraction model is not an error.
pub async fn load_service(config: &Config) -> Result<QueryService> {
    let store = load_store(&config.knowledge.path)?;
    if store.is_empty() {
        tracing::warn!("knowledge snapshot is empty; every answer will be a placeholder");
    }

    let embedder = embedding::create_embedder(&config.embedding).await?;
    if embedder.dims() > 0 {
        store.ensure_dims(embedder.dims()).with_context(|| {
            format!(
                "Snapshot {} was not built with embedding model '{}'",
                config.knowledge.path.display(),
                embedder.model_name()
            )
        })?;
    }

    let extractor = qa::create_extractor(&config.extractor).await;

    Ok(QueryService::new(Arc::new(store), embedder, extractor).with_top_k(config.retrieval.top_k))
}

/// Answer `question` and print the result.
pub async fn run_ask(config: &Config, question: &str, json: bool) -> Result<()> {
    let service = load_service(config).await?;

    let result = service.answer(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", result.answer);
    println!();
    println!("score: {:.4}", result.score);
    if result.sources.is_empty() {
        println!("sources: none");
    } else {
        println!("sources:");
        for source in &result.sources {
            let marker = if result.source_id == Some(source.id) {
                "  <- answer"
            } else {
                ""
            };
            println!("  #{:<4} sim {:.4}{}", source.id, source.sim, marker);
        }
    }
    Ok(())
}
