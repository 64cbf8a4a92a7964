//! # askdoc Core
//!
//! Retrieval-augmented question answering over a single, fixed document.
//!
//! This crate holds the pure pipeline: paragraph chunking, the immutable
//! knowledge store, cosine top-K retrieval, the optional span extractor and
//! the answer arbiter, composed by [`service::QueryService`]. It performs no
//! filesystem or network I/O; model runtimes and snapshot files live in the
//! `askdoc` app crate and are injected through the [`embedding::Embedder`]
//! and [`answer::SpanExtractor`] traits.
//!
//! ```text
//! raw text ──▶ chunk ──▶ build (embed) ──▶ KnowledgeStore      (offline)
//!
//! question ──▶ embed ──▶ retrieve::top_k ──▶ answer::select    (online)
//! ```

pub mod answer;
pub mod build;
pub mod chunk;
pub mod embedding;
pub mod models;
pub mod retrieve;
pub mod service;
pub mod store;
