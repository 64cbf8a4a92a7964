//! Top-K retrieval by cosine similarity.
//!
//! A brute-force linear scan over the store. The document is expected to
//! produce at most a few hundred chunks, well within what a full scan
//! handles per request.

use crate::embedding::cosine_similarity;
use crate::models::ScoredChunk;
use crate::store::KnowledgeStore;

/// Number of candidates retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Rank every chunk in `store` against `query` and return the best `k`.
///
/// Results are sorted by descending similarity. The sort is stable, so
/// chunks with equal scores keep document order. Returns
/// `min(k, store.len())` results.
///
/// `query` must have the store's embedding dimension.
pub fn top_k<'a>(query: &[f32], store: &'a KnowledgeStore, k: usize) -> Vec<ScoredChunk<'a>> {
    let mut scored: Vec<ScoredChunk<'a>> = store
        .chunks()
        .iter()
        .map(|chunk| ScoredChunk {
            chunk,
            score: cosine_similarity(query, &chunk.embedding),
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}
