//! `askdoc build` and `askdoc chunk`: turn the source document into a
//! knowledge snapshot, or preview how it would be chunked.

use anyhow::{Context, Result};
use std::path::Path;

use askdoc_core::build::build_store;
use askdoc_core::chunk::chunk_text;

use crate::config::Config;
use crate::embedding;
use crate::extract::read_document;
use crate::snapshot::write_snapshot;

/// Characters of chunk text shown by `askdoc chunk`.
const PREVIEW_CHARS: usize = 72;

/// Extract, chunk, embed, and write the snapshot.
///
/// Writes to `output` when given, otherwise to `[knowledge].path`. Nothing
/// is written if any step fails.
pub async fn run_build(config: &Config, input: &Path, output: Option<&Path>) -> Result<()> {
    let raw = read_document(input)
        .with_context(|| format!("Failed to extract text from {}", input.display()))?;
    tracing::info!(
        input = %input.display(),
        chars = raw.chars().count(),
        "extracted document text"
    );

    let embedder = embedding::create_embedder(&config.embedding).await?;
    let store = build_store(
        &raw,
        embedder.as_ref(),
        config.knowledge.max_chunk_chars,
        config.embedding.batch_size,
    )
    .await?;
    if embedder.dims() > 0 {
        store.ensure_dims(embedder.dims())?;
    }

    let path = output.unwrap_or(config.knowledge.path.as_path());
    write_snapshot(path, &store)?;

    println!("build");
    println!("  input: {}", input.display());
    println!("  model: {}", embedder.model_name());
    println!("  chunks: {}", store.len());
    println!("  output: {}", path.display());
    Ok(())
}

/// Print the chunks `input` would produce, without embedding anything.
pub fn run_chunk_preview(config: &Config, input: &Path) -> Result<()> {
    let raw = read_document(input)
        .with_context(|| format!("Failed to extract text from {}", input.display()))?;
    let chunks = chunk_text(&raw, config.knowledge.max_chunk_chars);

    if chunks.is_empty() {
        println!("No chunks.");
        return Ok(());
    }

    for chunk in &chunks {
        println!(
            "{:>4}  {:>5} chars  {}",
            chunk.id,
            chunk.text.chars().count(),
            preview(&chunk.text)
        );
    }
    println!();
    println!("{} chunks (max {} chars)", chunks.len(), config.knowledge.max_chunk_chars);
    Ok(())
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut.trim_end())
}
