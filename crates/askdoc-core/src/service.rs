//! The query service: one question in, one [`AnswerResult`] out.
//!
//! Composes the embedding provider, the retriever and the answer arbiter.
//! All collaborators are injected at construction and shared read-only
//! across requests.

use std::sync::Arc;

use thiserror::Error;

use crate::answer::{self, Extractor};
use crate::embedding::Embedder;
use crate::models::AnswerResult;
use crate::retrieve::{self, DEFAULT_TOP_K};
use crate::store::KnowledgeStore;

/// Minimum number of characters in a trimmed question.
pub const MIN_QUESTION_CHARS: usize = 3;

/// Errors surfaced by [`QueryService::answer`].
#[derive(Debug, Error)]
pub enum QueryError {
    /// The question was rejected before any processing.
    #[error("{0}")]
    InvalidInput(String),

    /// An unexpected failure downstream (embedding call, dimension mismatch).
    #[error("failed to process question: {0:#}")]
    Processing(#[source] anyhow::Error),
}

/// Answers questions against a loaded [`KnowledgeStore`].
#[derive(Clone)]
pub struct QueryService {
    store: Arc<KnowledgeStore>,
    embedder: Arc<dyn Embedder>,
    extractor: Extractor,
    top_k: usize,
}

impl QueryService {
    pub fn new(
        store: Arc<KnowledgeStore>,
        embedder: Arc<dyn Embedder>,
        extractor: Extractor,
    ) -> Self {
        Self {
            store,
            embedder,
            extractor,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Override the number of retrieved candidates (minimum 1).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Answer `question`.
    ///
    /// # Errors
    ///
    /// - [`QueryError::InvalidInput`] when the trimmed question is shorter
    ///   than [`MIN_QUESTION_CHARS`].
    /// - [`QueryError::Processing`] when embedding fails or the query vector
    ///   does not match the store's dimension.
    pub async fn answer(&self, question: &str) -> Result<AnswerResult, QueryError> {
        let question = question.trim();
        if question.chars().count() < MIN_QUESTION_CHARS {
            return Err(QueryError::InvalidInput("Question too short.".to_string()));
        }

        let query_vec = self
            .embedder
            .embed(question)
            .await
            .map_err(QueryError::Processing)?;

        if let Some(dims) = self.store.dims() {
            if query_vec.len() != dims {
                return Err(QueryError::Processing(anyhow::anyhow!(
                    "query embedding has dimension {}, store has {}",
                    query_vec.len(),
                    dims
                )));
            }
        }

        let candidates = retrieve::top_k(&query_vec, &self.store, self.top_k);
        tracing::debug!(
            candidates = candidates.len(),
            best = candidates.first().map(|c| c.score),
            "retrieved candidates"
        );

        Ok(answer::select(&self.extractor, question, &candidates).await)
    }
}
