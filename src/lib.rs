//! # askdoc
//!
//! Ask questions about one regulation document and get answers grounded in
//! its text.
//!
//! askdoc splits the document into paragraph-aligned chunks, embeds them
//! once into a JSON snapshot, and answers questions by retrieving the most
//! similar chunks and extracting an answer span from them with a local
//! question-answering model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐
//! │ PDF/text │──▶│ Chunk+Embed │──▶│ chunks.json  │
//! └──────────┘   └─────────────┘   └──────┬───────┘
//!                                         │
//!                          ┌──────────────┤
//!                          ▼              ▼
//!                     ┌──────────┐  ┌──────────┐
//!                     │   CLI    │  │   HTTP   │
//!                     │  (ask)   │  │  (/ask)  │
//!                     └──────────┘  └──────────┘
//! ```
//!
//! Pure logic (chunking, retrieval, answer selection, the query service)
//! lives in the `askdoc-core` crate. This crate provides the I/O around it:
//! configuration, document extraction, model-backed providers, the
//! snapshot file, the CLI commands, and the HTTP server.
//!
//! ## Quick Start
//!
//! ```bash
//! askdoc build ./docs/regulation.pdf   # write ./data/chunks.json
//! askdoc ask "What is the minimum age?"
//! askdoc serve                         # POST /ask on 127.0.0.1:3000
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF and text extraction |
//! | [`embedding`] | Embedding providers (fastembed, Ollama, hashed) |
//! | [`qa`] | Answer span extraction model |
//! | [`snapshot`] | Knowledge snapshot read/write |
//! | [`build_cmd`] | `build` and `chunk` commands |
//! | [`ask`] | `ask` command and service startup |
//! | [`server`] | HTTP server |
//! | [`logging`] | tracing subscriber setup |

pub mod ask;
pub mod build_cmd;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod logging;
pub mod qa;
pub mod server;
pub mod snapshot;
