//! Core data types shared by the offline build and the online query path.

use serde::{Deserialize, Serialize};

/// A paragraph-aligned segment of the source document with its embedding.
///
/// This is also the record format of the knowledge store snapshot:
/// `{ "id": 1, "text": "...", "embedding": [0.01, ...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// 1-based position in document order.
    pub id: u32,
    /// Trimmed, non-empty chunk text.
    pub text: String,
    /// Vector produced by the embedding provider for `text`.
    pub embedding: Vec<f32>,
}

/// Chunker output, before an embedding has been attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    pub id: u32,
    pub text: String,
}

impl TextChunk {
    /// Attach an embedding, producing a store-ready [`Chunk`].
    pub fn with_embedding(self, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: self.id,
            text: self.text,
            embedding,
        }
    }
}

/// A stored chunk ranked against one query. Higher `score` is more similar.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

/// An answer span proposed for one candidate context.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAnswer {
    pub text: String,
    pub confidence: f32,
    pub source_id: Option<u32>,
}

/// One retrieved chunk as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Source {
    pub id: u32,
    pub sim: f32,
}

/// Final answer for one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    /// Extracted span, or the fallback passage text.
    pub answer: String,
    /// Every retrieved candidate, in rank order.
    pub sources: Vec<Source>,
    /// Extraction confidence; `0.0` for similarity-only fallbacks.
    pub score: f32,
    /// Chunk the answer came from, if any.
    #[serde(skip_serializing)]
    pub source_id: Option<u32>,
}
