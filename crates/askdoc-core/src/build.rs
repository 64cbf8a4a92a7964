//! Offline knowledge builder: raw text to embedded chunks.
//!
//! Runs the chunker, then embeds every chunk through the injected
//! [`Embedder`], batch by batch, in document order. Any provider failure
//! aborts the whole build so that no partial snapshot can be produced.

use anyhow::{bail, Context, Result};

use crate::chunk::chunk_text;
use crate::embedding::Embedder;
use crate::models::Chunk;
use crate::store::KnowledgeStore;

/// Chunk `raw` and embed every chunk.
///
/// `batch_size` bounds the number of texts per provider call (minimum 1).
/// The returned store satisfies all [`KnowledgeStore`] invariants.
///
/// # Errors
///
/// Fails if the provider errors, returns the wrong number of vectors, or
/// returns vectors whose dimension differs from the others.
pub async fn build_store(
    raw: &str,
    embedder: &dyn Embedder,
    max_len: usize,
    batch_size: usize,
) -> Result<KnowledgeStore> {
    let text_chunks = chunk_text(raw, max_len);
    tracing::info!(
        chunks = text_chunks.len(),
        max_len,
        model = embedder.model_name(),
        "chunked document"
    );

    let mut chunks: Vec<Chunk> = Vec::with_capacity(text_chunks.len());
    for batch in text_chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let first_id = batch[0].id;

        let vectors = embedder
            .embed_batch(&texts)
            .await
            .with_context(|| format!("embedding failed for batch starting at chunk {first_id}"))?;

        if vectors.len() != batch.len() {
            bail!(
                "embedding provider returned {} vectors for {} chunks (batch starting at chunk {})",
                vectors.len(),
                batch.len(),
                first_id
            );
        }

        for (chunk, vector) in batch.iter().cloned().zip(vectors) {
            chunks.push(chunk.with_embedding(vector));
        }
        tracing::debug!(embedded = chunks.len(), "embedded batch");
    }

    KnowledgeStore::new(chunks).context("embedded chunks violate store invariants")
}
