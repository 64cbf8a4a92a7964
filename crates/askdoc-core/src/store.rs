//! The immutable, pre-embedded knowledge store.
//!
//! A [`KnowledgeStore`] owns every [`Chunk`] of the document. It is built
//! once (from a snapshot or directly from the knowledge builder), validated,
//! and then only read. Query code borrows chunks from it for the duration of
//! a request.

use thiserror::Error;

use crate::models::Chunk;

/// Invariant violations detected while assembling a store.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("chunk ids must be contiguous from 1: expected {expected}, found {found}")]
    NonContiguousId { expected: u32, found: u32 },

    #[error("chunk {id} has empty text")]
    EmptyText { id: u32 },

    #[error("chunk {id} has an empty embedding")]
    EmptyEmbedding { id: u32 },

    #[error("chunk {id} has embedding dimension {found}, expected {expected}")]
    DimensionMismatch { id: u32, expected: usize, found: usize },

    #[error("chunk {id} has a non-finite embedding value")]
    NonFinite { id: u32 },

    #[error("store dimension {store} does not match embedding provider dimension {provider}")]
    ProviderMismatch { store: usize, provider: usize },
}

/// Ordered, read-only collection of embedded chunks.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    chunks: Vec<Chunk>,
    dims: Option<usize>,
}

impl KnowledgeStore {
    /// Validate and wrap `chunks`.
    ///
    /// Checks that ids run `1, 2, …, n` in order, texts are non-empty, and
    /// all embeddings share one non-zero dimension with finite values.
    pub fn new(chunks: Vec<Chunk>) -> Result<Self, StoreError> {
        let mut dims = None;

        for (i, chunk) in chunks.iter().enumerate() {
            let expected = i as u32 + 1;
            if chunk.id != expected {
                return Err(StoreError::NonContiguousId {
                    expected,
                    found: chunk.id,
                });
            }
            if chunk.text.trim().is_empty() {
                return Err(StoreError::EmptyText { id: chunk.id });
            }
            if chunk.embedding.is_empty() {
                return Err(StoreError::EmptyEmbedding { id: chunk.id });
            }
            if chunk.embedding.iter().any(|v| !v.is_finite()) {
                return Err(StoreError::NonFinite { id: chunk.id });
            }
            match dims {
                None => dims = Some(chunk.embedding.len()),
                Some(d) if d != chunk.embedding.len() => {
                    return Err(StoreError::DimensionMismatch {
                        id: chunk.id,
                        expected: d,
                        found: chunk.embedding.len(),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(Self { chunks, dims })
    }

    /// Chunks in document order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Shared embedding dimension, or `None` for an empty store.
    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    /// Look up a chunk by id.
    pub fn get(&self, id: u32) -> Option<&Chunk> {
        // ids are contiguous from 1, so the id is the position plus one
        id.checked_sub(1).and_then(|i| self.chunks.get(i as usize))
    }

    /// Check the store against the embedding provider's dimension.
    ///
    /// An empty store is compatible with any provider.
    pub fn ensure_dims(&self, provider_dims: usize) -> Result<(), StoreError> {
        match self.dims {
            Some(d) if d != provider_dims => Err(StoreError::ProviderMismatch {
                store: d,
                provider: provider_dims,
            }),
            _ => Ok(()),
        }
    }
}
