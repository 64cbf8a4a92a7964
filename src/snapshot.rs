//! Knowledge snapshot on disk.
//!
//! The snapshot is a JSON array of `{ "id", "text", "embedding" }` records
//! written by `askdoc build` and loaded once at startup by `ask` and
//! `serve`. Loading validates the whole store, so a broken snapshot stops
//! the process instead of producing wrong answers later.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use askdoc_core::models::Chunk;
use askdoc_core::store::KnowledgeStore;

/// Load and validate the snapshot at `path`.
pub fn load_store(path: &Path) -> Result<KnowledgeStore> {
    let data = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read knowledge snapshot: {} (run `askdoc build` first)",
            path.display()
        )
    })?;
    let chunks: Vec<Chunk> = serde_json::from_str(&data)
        .with_context(|| format!("Malformed knowledge snapshot: {}", path.display()))?;
    let store = KnowledgeStore::new(chunks)
        .with_context(|| format!("Invalid knowledge snapshot: {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        chunks = store.len(),
        dims = ?store.dims(),
        "loaded knowledge snapshot"
    );
    Ok(store)
}

/// Write `store` to `path` as pretty-printed JSON.
///
/// The file is written to a temporary sibling and renamed into place, so
/// readers see either the old snapshot or the new one.
pub fn write_snapshot(path: &Path, store: &KnowledgeStore) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let json = serde_json::to_vec_pretty(store.chunks())?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync snapshot: {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;

    tracing::debug!(path = %path.display(), bytes = json.len(), "wrote knowledge snapshot");
    Ok(())
}
