//! Answer extraction and arbitration.
//!
//! The [`Extractor`] wraps an optional span-extraction model. It is either
//! [`Enabled`](Extractor::Enabled) with a model handle or
//! [`Disabled`](Extractor::Disabled) for the lifetime of the process (when
//! the model is not configured or failed to load).
//!
//! [`select`] runs the extractor over every retrieved candidate and keeps
//! the most confident span. When no span is produced it falls back to the
//! text of the most similar chunk.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AnswerResult, CandidateAnswer, ScoredChunk, Source};

/// Answer returned when there is no candidate context at all.
pub const NO_ANSWER: &str = "(no answer found)";

/// A span proposed by an extraction model.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// Substring of the context that answers the question.
    pub text: String,
    /// Model confidence, higher is better.
    pub confidence: f32,
}

/// A question-answering model that extracts a span from a context.
#[async_trait]
pub trait SpanExtractor: Send + Sync {
    /// Returns the model identifier.
    fn model_name(&self) -> &str;

    /// Propose the span of `context` that best answers `question`.
    async fn extract(&self, question: &str, context: &str) -> Result<Span>;
}

/// The answer extractor, enabled or permanently disabled.
#[derive(Clone)]
pub enum Extractor {
    Enabled(Arc<dyn SpanExtractor>),
    Disabled,
}

impl Extractor {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Extractor::Enabled(_))
    }

    /// Extract an answer for one candidate chunk.
    ///
    /// Returns `None` when the extractor is disabled, an input is empty, the
    /// model call fails, or the span is empty or has a non-finite
    /// confidence. A failure here never affects other candidates.
    pub async fn extract(
        &self,
        question: &str,
        candidate: &ScoredChunk<'_>,
    ) -> Option<CandidateAnswer> {
        let model = match self {
            Extractor::Enabled(model) => model,
            Extractor::Disabled => return None,
        };

        let context = candidate.chunk.text.as_str();
        if question.trim().is_empty() || context.trim().is_empty() {
            return None;
        }

        let span = match model.extract(question, context).await {
            Ok(span) => span,
            Err(e) => {
                tracing::warn!(
                    chunk_id = candidate.chunk.id,
                    model = model.model_name(),
                    error = %e,
                    "span extraction failed; skipping candidate"
                );
                return None;
            }
        };

        let text = span.text.trim();
        if text.is_empty() || !span.confidence.is_finite() {
            return None;
        }

        Some(CandidateAnswer {
            text: text.to_string(),
            confidence: span.confidence,
            source_id: Some(candidate.chunk.id),
        })
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Extractor::Enabled(model) => write!(f, "Extractor::Enabled({})", model.model_name()),
            Extractor::Disabled => write!(f, "Extractor::Disabled"),
        }
    }
}

/// Choose the answer for `question` among the retrieved `candidates`.
///
/// Candidates are visited in rank order and the strictly highest confidence
/// wins, so the first of several equal confidences is kept. Without any
/// extracted span the answer is the text of the first (most similar)
/// candidate with score `0.0`, or [`NO_ANSWER`] when there are no candidates.
/// `sources` always lists every candidate with its similarity.
pub async fn select(
    extractor: &Extractor,
    question: &str,
    candidates: &[ScoredChunk<'_>],
) -> AnswerResult {
    let sources = candidates
        .iter()
        .map(|c| Source {
            id: c.chunk.id,
            sim: c.score,
        })
        .collect();

    let mut best: Option<CandidateAnswer> = None;
    if extractor.is_enabled() {
        for candidate in candidates {
            let Some(answer) = extractor.extract(question, candidate).await else {
                continue;
            };
            let better = best
                .as_ref()
                .map_or(true, |b| answer.confidence > b.confidence);
            if better {
                best = Some(answer);
            }
        }
    }

    match best {
        Some(answer) => AnswerResult {
            answer: answer.text,
            sources,
            score: answer.confidence,
            source_id: answer.source_id,
        },
        None => {
            let top = candidates.first();
            AnswerResult {
                answer: top
                    .map(|c| c.chunk.text.clone())
                    .unwrap_or_else(|| NO_ANSWER.to_string()),
                sources,
                score: 0.0,
                source_id: top.map(|c| c.chunk.id),
            }
        }
    }
}
