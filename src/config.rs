//! TOML configuration.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working configuration that serves `./data/chunks.json`
//! with the local fastembed provider. See `config/askdoc.example.toml`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use askdoc_core::chunk::DEFAULT_MAX_CHUNK_CHARS;
use askdoc_core::retrieve::DEFAULT_TOP_K;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    /// Snapshot written by `askdoc build` and loaded by `ask`/`serve`.
    #[serde(default = "default_knowledge_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: default_knowledge_path(),
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

fn default_knowledge_path() -> PathBuf {
    PathBuf::from("./data/chunks.json")
}
fn default_max_chunk_chars() -> usize {
    DEFAULT_MAX_CHUNK_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `local` (fastembed), `ollama`, or `hashed`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    32
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_qa_model")]
    pub model: String,
    /// Directory holding `model.onnx` and `tokenizer.json`; skips the download.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
    #[serde(default = "default_max_answer_tokens")]
    pub max_answer_tokens: usize,
    #[serde(default = "default_max_seq_len")]
    pub max_seq_len: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_qa_model(),
            model_dir: None,
            max_answer_tokens: default_max_answer_tokens(),
            max_seq_len: default_max_seq_len(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_qa_model() -> String {
    "distilbert-base-uncased-distilled-squad".to_string()
}
fn default_max_answer_tokens() -> usize {
    15
}
fn default_max_seq_len() -> usize {
    384
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Request bodies above this size are rejected with 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Load and validate the configuration at `path`.
///
/// A missing file is not an error: defaults are used and a warning is
/// logged. A file that exists but fails to parse or validate is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "config file not found; using defaults");
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.knowledge.max_chunk_chars == 0 {
        bail!("knowledge.max_chunk_chars must be > 0");
    }

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.batch_size < 1 {
        bail!("embedding.batch_size must be >= 1");
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }
    match config.embedding.provider.as_str() {
        "local" | "ollama" | "hashed" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be local, ollama, or hashed.",
            other
        ),
    }
    if config.embedding.provider == "ollama" && config.embedding.model.is_none() {
        bail!("embedding.model must be specified when provider is 'ollama'");
    }

    if config.extractor.max_answer_tokens < 1 {
        bail!("extractor.max_answer_tokens must be >= 1");
    }
    if config.extractor.max_seq_len < 32 {
        bail!("extractor.max_seq_len must be >= 32");
    }

    if config.server.max_body_bytes == 0 {
        bail!("server.max_body_bytes must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.knowledge.path, PathBuf::from("./data/chunks.json"));
        assert_eq!(cfg.knowledge.max_chunk_chars, 1200);
        assert_eq!(cfg.retrieval.top_k, 3);
        assert_eq!(cfg.embedding.provider, "local");
        assert!(cfg.extractor.enabled);
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
        assert_eq!(cfg.server.max_body_bytes, 1_048_576);
    }

    #[test]
    fn test_full_config() {
        let cfg = parse_config(
            r#"
[knowledge]
path = "/tmp/kb.json"
max_chunk_chars = 800

[retrieval]
top_k = 5

[embedding]
provider = "hashed"
dims = 64
batch_size = 4

[extractor]
enabled = false

[server]
bind = "0.0.0.0:8080"
max_body_bytes = 4096
"#,
        )
        .unwrap();
        assert_eq!(cfg.knowledge.max_chunk_chars, 800);
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.embedding.dims, Some(64));
        assert!(!cfg.extractor.enabled);
        assert_eq!(cfg.server.max_body_bytes, 4096);
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse_config("[embedding]\nprovider = \"openai\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("Unknown embedding provider"));
    }

    #[test]
    fn test_rejects_zero_values() {
        assert!(parse_config("[knowledge]\nmax_chunk_chars = 0\n").is_err());
        assert!(parse_config("[retrieval]\ntop_k = 0\n").is_err());
        assert!(parse_config("[embedding]\nprovider = \"hashed\"\ndims = 0\n").is_err());
        assert!(parse_config("[server]\nmax_body_bytes = 0\n").is_err());
    }

    #[test]
    fn test_ollama_requires_model() {
        assert!(parse_config("[embedding]\nprovider = \"ollama\"\n").is_err());
        assert!(
            parse_config("[embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\n")
                .is_ok()
        );
    }

    #[test]
    fn test_rejects_unknown_section() {
        assert!(parse_config("[db]\npath = \"x\"\n").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = load_config(Path::new("/nonexistent/askdoc.toml")).unwrap();
        assert_eq!(cfg.retrieval.top_k, 3);
    }
}
