//! Extractive question answering with a local ONNX model.
//!
//! Pure-Rust path, like the rest of the local inference: the model runs on
//! tract-onnx and inputs are encoded with the `tokenizers` crate. Model files
//! are downloaded from Hugging Face into `~/.cache/askdoc/models/<model>/`
//! on first use, or read from `extractor.model_dir` when configured.
//!
//! The model lives on a dedicated worker thread. Requests arrive over a
//! channel and are answered one at a time, so concurrent HTTP requests never
//! run the model in parallel.
//!
//! [`create_extractor`] never fails: if the model is disabled, cannot be
//! loaded, or the crate was built without the `span-extraction` feature, it
//! returns [`Extractor::Disabled`] and the service answers with retrieved
//! passages instead.

use askdoc_core::answer::Extractor;

use crate::config::ExtractorConfig;

/// Build the answer extractor for the process lifetime.
pub async fn create_extractor(config: &ExtractorConfig) -> Extractor {
    if !config.enabled {
        tracing::info!("answer extraction disabled by config");
        return Extractor::Disabled;
    }
    load_extractor(config).await
}

#[cfg(feature = "span-extraction")]
async fn load_extractor(config: &ExtractorConfig) -> Extractor {
    use std::sync::Arc;

    match tract_backend::TractSpanExtractor::load(config).await {
        Ok(model) => {
            tracing::info!(model = %config.model, "answer extraction model ready");
            Extractor::Enabled(Arc::new(model))
        }
        Err(e) => {
            tracing::warn!(
                model = %config.model,
                error = %format!("{e:#}"),
                "answer extraction model unavailable; answering with retrieved passages"
            );
            Extractor::Disabled
        }
    }
}

#[cfg(not(feature = "span-extraction"))]
async fn load_extractor(_config: &ExtractorConfig) -> Extractor {
    tracing::warn!(
        "built without the span-extraction feature; answering with retrieved passages"
    );
    Extractor::Disabled
}

/// Softmax over the positions where `mask` is set. Masked-out positions
/// get probability zero. Returns `None` if no position is selected.
fn masked_softmax(logits: &[f32], mask: &[bool]) -> Option<Vec<f32>> {
    let max = logits
        .iter()
        .zip(mask)
        .filter(|(_, &m)| m)
        .map(|(&l, _)| l)
        .fold(f32::NEG_INFINITY, f32::max);
    if max == f32::NEG_INFINITY {
        return None;
    }

    let mut probs: Vec<f32> = logits
        .iter()
        .zip(mask)
        .map(|(&l, &m)| if m { (l - max).exp() } else { 0.0 })
        .collect();
    let sum: f32 = probs.iter().sum();
    if !(sum > 0.0) {
        return None;
    }
    for p in &mut probs {
        *p /= sum;
    }
    Some(probs)
}

/// Pick the most probable answer span from start/end logits.
///
/// Only tokens with `context_mask` set may start or end a span, the end
/// may not precede the start, and a span covers at most
/// `max_answer_tokens` tokens. The score is `p(start) * p(end)`; on ties
/// the earliest span wins. Returns `(start, end, score)` with inclusive
/// token indices.
pub fn best_span(
    start_logits: &[f32],
    end_logits: &[f32],
    context_mask: &[bool],
    max_answer_tokens: usize,
) -> Option<(usize, usize, f32)> {
    let n = start_logits.len().min(end_logits.len()).min(context_mask.len());
    let mask = &context_mask[..n];
    let p_start = masked_softmax(&start_logits[..n], mask)?;
    let p_end = masked_softmax(&end_logits[..n], mask)?;

    let mut best: Option<(usize, usize, f32)> = None;
    for s in (0..n).filter(|&s| mask[s]) {
        let last = (s + max_answer_tokens.max(1)).min(n);
        for e in (s..last).filter(|&e| mask[e]) {
            let score = p_start[s] * p_end[e];
            if best.map_or(true, |(_, _, b)| score > b) {
                best = Some((s, e, score));
            }
        }
    }
    best
}

#[cfg(feature = "span-extraction")]
mod tract_backend {
    use anyhow::{anyhow, bail, Result};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use tokenizers::{Tokenizer, TruncationParams, TruncationStrategy};
    use tokio::sync::{mpsc, oneshot};
    use tract_onnx::prelude::*;

    use askdoc_core::answer::{Span, SpanExtractor};

    use super::best_span;
    use crate::config::ExtractorConfig;

    const HF_ORG: &str = "Xenova";
    const ONNX_FILE: &str = "onnx/model.onnx";
    const TOKENIZER_FILE: &str = "tokenizer.json";
    const QUEUE_DEPTH: usize = 64;

    struct Job {
        question: String,
        context: String,
        reply: oneshot::Sender<Result<Span>>,
    }

    /// Span extractor backed by a tract plan on its own thread.
    pub struct TractSpanExtractor {
        model_name: String,
        jobs: mpsc::Sender<Job>,
    }

    impl TractSpanExtractor {
        /// Start the worker and wait until the model is loaded.
        pub async fn load(config: &ExtractorConfig) -> Result<Self> {
            let (jobs, rx) = mpsc::channel(QUEUE_DEPTH);
            let (ready_tx, ready_rx) = oneshot::channel();
            let worker_config = config.clone();

            std::thread::Builder::new()
                .name("askdoc-qa".to_string())
                .spawn(move || worker(worker_config, ready_tx, rx))
                .map_err(|e| anyhow!("Spawn QA worker: {}", e))?;

            ready_rx
                .await
                .map_err(|_| anyhow!("QA worker exited during startup"))??;

            Ok(Self {
                model_name: config.model.clone(),
                jobs,
            })
        }
    }

    #[async_trait]
    impl SpanExtractor for TractSpanExtractor {
        fn model_name(&self) -> &str {
            &self.model_name
        }

        async fn extract(&self, question: &str, context: &str) -> Result<Span> {
            let (reply, rx) = oneshot::channel();
            self.jobs
                .send(Job {
                    question: question.to_string(),
                    context: context.to_string(),
                    reply,
                })
                .await
                .map_err(|_| anyhow!("QA worker stopped"))?;
            rx.await.map_err(|_| anyhow!("QA worker dropped the request"))?
        }
    }

    fn worker(
        config: ExtractorConfig,
        ready: oneshot::Sender<Result<()>>,
        mut jobs: mpsc::Receiver<Job>,
    ) {
        let init = || -> Result<_> {
            let (onnx_path, tokenizer_path) = model_files(&config)?;
            let tokenizer = load_tokenizer(&tokenizer_path, config.max_seq_len)?;
            let plan = tract_onnx::onnx()
                .model_for_path(&onnx_path)
                .map_err(|e| anyhow!("Load ONNX: {}", e))?
                .into_optimized()
                .map_err(|e| anyhow!("Optimize: {}", e))?
                .into_runnable()
                .map_err(|e| anyhow!("Build tract runnable: {}", e))?;
            Ok((tokenizer, plan))
        };

        let (tokenizer, plan) = match init() {
            Ok(loaded) => {
                let _ = ready.send(Ok(()));
                loaded
            }
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        while let Some(job) = jobs.blocking_recv() {
            let result = extract_span(
                &tokenizer,
                |ids, mask| {
                    let outputs = plan.run(tvec!(ids.into(), mask.into()))?;
                    if outputs.len() < 2 {
                        bail!("QA model returned {} outputs, expected 2", outputs.len());
                    }
                    let start = outputs[0].to_array_view::<f32>()?.iter().copied().collect();
                    let end = outputs[1].to_array_view::<f32>()?.iter().copied().collect();
                    Ok((start, end))
                },
                &job.question,
                &job.context,
                config.max_answer_tokens,
            );
            let _ = job.reply.send(result);
        }
        tracing::debug!("QA worker shutting down");
    }

    fn extract_span(
        tokenizer: &Tokenizer,
        mut run: impl FnMut(Tensor, Tensor) -> Result<(Vec<f32>, Vec<f32>)>,
        question: &str,
        context: &str,
        max_answer_tokens: usize,
    ) -> Result<Span> {
        let encoding = tokenizer
            .encode((question, context), true)
            .map_err(|e| anyhow!("Tokenize: {}", e))?;
        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let len = ids.len();
        let mask = vec![1i64; len];

        let ids: Tensor = ndarray::Array2::from_shape_vec((1, len), ids)
            .map_err(|e| anyhow!("Input ids shape: {}", e))?
            .into();
        let mask: Tensor = ndarray::Array2::from_shape_vec((1, len), mask)
            .map_err(|e| anyhow!("Attention mask shape: {}", e))?
            .into();

        let (start_logits, end_logits) = run(ids, mask)?;
        if start_logits.len() != len || end_logits.len() != len {
            bail!(
                "QA model returned {}/{} logits for {} tokens",
                start_logits.len(),
                end_logits.len(),
                len
            );
        }

        let context_mask: Vec<bool> = encoding
            .get_sequence_ids()
            .iter()
            .map(|seq| *seq == Some(1))
            .collect();

        let Some((s, e, confidence)) =
            best_span(&start_logits, &end_logits, &context_mask, max_answer_tokens)
        else {
            return Ok(Span {
                text: String::new(),
                confidence: 0.0,
            });
        };

        // Offsets of pair encodings are relative to their own sequence.
        let offsets = encoding.get_offsets();
        let text = context
            .get(offsets[s].0..offsets[e].1)
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(Span { text, confidence })
    }

    fn load_tokenizer(path: &Path, max_seq_len: usize) -> Result<Tokenizer> {
        let mut tokenizer =
            Tokenizer::from_file(path).map_err(|e| anyhow!("Load tokenizer: {}", e))?;
        configure_tokenizer(&mut tokenizer, max_seq_len)?;
        Ok(tokenizer)
    }

    /// No padding; only the context is cut when the pair exceeds `max_seq_len`.
    fn configure_tokenizer(tokenizer: &mut Tokenizer, max_seq_len: usize) -> Result<()> {
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_len,
                strategy: TruncationStrategy::OnlySecond,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Configure truncation: {}", e))?;
        Ok(())
    }

    /// Resolve (onnx path, tokenizer path), downloading into the cache if needed.
    fn model_files(config: &ExtractorConfig) -> Result<(PathBuf, PathBuf)> {
        if let Some(dir) = &config.model_dir {
            let onnx = dir.join("model.onnx");
            let tokenizer = dir.join(TOKENIZER_FILE);
            for path in [&onnx, &tokenizer] {
                if !path.exists() {
                    bail!("Missing model file: {}", path.display());
                }
            }
            return Ok((onnx, tokenizer));
        }

        let repo = format!("{}/{}", HF_ORG, config.model);
        let model_dir = cache_dir()?.join(&config.model);
        let onnx = model_dir.join(ONNX_FILE);
        let tokenizer = model_dir.join(TOKENIZER_FILE);
        download_to_cache(&repo, ONNX_FILE, &onnx)?;
        download_to_cache(&repo, TOKENIZER_FILE, &tokenizer)?;
        Ok((onnx, tokenizer))
    }

    fn cache_dir() -> Result<PathBuf> {
        let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let dir = PathBuf::from(base)
            .join(".cache")
            .join("askdoc")
            .join("models");
        std::fs::create_dir_all(&dir).map_err(|e| anyhow!("Create cache dir: {}", e))?;
        Ok(dir)
    }

    fn download_to_cache(repo: &str, file: &str, dest: &Path) -> Result<()> {
        if dest.exists() {
            return Ok(());
        }
        let url = format!("https://huggingface.co/{}/resolve/main/{}", repo, file);
        tracing::info!(%url, "downloading QA model file");

        let bytes = reqwest::blocking::get(&url)
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map_err(|e| anyhow!("Download {}: {}", url, e))?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Create cache parent: {}", e))?;
        }
        // Cache entries are either complete or absent.
        let partial = dest.with_extension("part");
        std::fs::write(&partial, &bytes).map_err(|e| anyhow!("Write cache: {}", e))?;
        std::fs::rename(&partial, dest).map_err(|e| anyhow!("Write cache: {}", e))?;
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::str::FromStr;

        const VOCAB: [&str; 12] = [
            "[PAD]", "[CLS]", "[SEP]", "[UNK]", "what", "is", "the", "minimum", "age", "18",
            "years", ".",
        ];

        /// Word-level BERT-style pair tokenizer over a tiny vocabulary.
        fn word_tokenizer(max_seq_len: usize) -> Tokenizer {
            let vocab: serde_json::Map<String, serde_json::Value> = VOCAB
                .iter()
                .enumerate()
                .map(|(i, t)| (t.to_string(), serde_json::json!(i)))
                .collect();
            let special = |id: &str, type_id: u32| {
                serde_json::json!({ "SpecialToken": { "id": id, "type_id": type_id } })
            };
            let seq = |id: &str, type_id: u32| {
                serde_json::json!({ "Sequence": { "id": id, "type_id": type_id } })
            };
            let json = serde_json::json!({
                "version": "1.0",
                "truncation": null,
                "padding": null,
                "added_tokens": [],
                "normalizer": null,
                "pre_tokenizer": { "type": "Whitespace" },
                "post_processor": {
                    "type": "TemplateProcessing",
                    "single": [special("[CLS]", 0), seq("A", 0), special("[SEP]", 0)],
                    "pair": [
                        special("[CLS]", 0),
                        seq("A", 0),
                        special("[SEP]", 0),
                        seq("B", 1),
                        special("[SEP]", 1),
                    ],
                    "special_tokens": {
                        "[CLS]": { "id": "[CLS]", "ids": [1], "tokens": ["[CLS]"] },
                        "[SEP]": { "id": "[SEP]", "ids": [2], "tokens": ["[SEP]"] },
                    },
                },
                "decoder": null,
                "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" },
            });
            let mut tokenizer = Tokenizer::from_str(&json.to_string()).unwrap();
            configure_tokenizer(&mut tokenizer, max_seq_len).unwrap();
            tokenizer
        }

        /// Logits that peak at the first `start` token and the first `end`
        /// token, with a larger decoy peak on the question word "what".
        fn peaked(
            tokenizer: &Tokenizer,
            ids: &Tensor,
            start: &str,
            end: &str,
        ) -> (Vec<f32>, Vec<f32>) {
            let id = |t: &str| tokenizer.token_to_id(t).unwrap() as i64;
            let ids = ids.as_slice::<i64>().unwrap();
            let logits = |target: i64| -> Vec<f32> {
                ids.iter()
                    .map(|&tok| {
                        if tok == id("what") {
                            20.0
                        } else if tok == target {
                            10.0
                        } else {
                            0.0
                        }
                    })
                    .collect()
            };
            (logits(id(start)), logits(id(end)))
        }

        #[test]
        fn test_extract_span_cuts_answer_from_context() {
            let tokenizer = word_tokenizer(384);
            let context = "the minimum age is 18 years.";

            let span = extract_span(
                &tokenizer,
                |ids, mask| {
                    assert_eq!(ids.shape(), mask.shape());
                    Ok(peaked(&tokenizer, &ids, "18", "years"))
                },
                "what is the minimum age",
                context,
                15,
            )
            .unwrap();

            assert_eq!(span.text, "18 years");
            assert!(span.confidence > 0.0 && span.confidence <= 1.0);
        }

        #[test]
        fn test_extract_span_truncates_only_context() {
            // [CLS] + 5 question words + [SEP] + 4 context words + [SEP]
            let tokenizer = word_tokenizer(12);
            let question = "what is the minimum age";
            let mut seen = 0;

            let span = extract_span(
                &tokenizer,
                |ids, _mask| {
                    seen = ids.shape()[1];
                    let words = ids.as_slice::<i64>().unwrap();
                    let what = tokenizer.token_to_id("what").unwrap() as i64;
                    assert_eq!(words[1], what);
                    Ok(peaked(&tokenizer, &ids, "age", "is"))
                },
                question,
                "the minimum age is 18 years.",
                15,
            )
            .unwrap();

            assert_eq!(seen, 12);
            assert_eq!(span.text, "age is");
        }

        #[test]
        fn test_extract_span_rejects_logit_length_mismatch() {
            let tokenizer = word_tokenizer(384);
            let result = extract_span(
                &tokenizer,
                |_, _| Ok((vec![0.0; 3], vec![0.0; 3])),
                "what is the minimum age",
                "the minimum age is 18 years.",
                15,
            );
            assert!(result.is_err());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [bool; 5] = [true; 5];

    #[test]
    fn test_picks_peak_span() {
        let start = [0.0, 0.0, 5.0, 0.0, 0.0];
        let end = [0.0, 0.0, 0.0, 5.0, 0.0];
        let (s, e, score) = best_span(&start, &end, &ALL, 15).unwrap();
        assert_eq!((s, e), (2, 3));
        assert!(score > 0.0 && score <= 1.0);
    }

    #[test]
    fn test_ignores_question_tokens() {
        let start = [9.0, 0.0, 0.0, 3.0, 0.0];
        let end = [9.0, 0.0, 0.0, 3.0, 0.0];
        let mask = [false, false, true, true, true];
        let (s, e, _) = best_span(&start, &end, &mask, 15).unwrap();
        assert_eq!((s, e), (3, 3));
    }

    #[test]
    fn test_end_never_precedes_start() {
        let start = [0.0, 0.0, 0.0, 6.0, 0.0];
        let end = [0.0, 6.0, 0.0, 0.0, 2.0];
        let (s, e, _) = best_span(&start, &end, &ALL, 15).unwrap();
        assert!(e >= s);
    }

    #[test]
    fn test_respects_max_answer_tokens() {
        let start = [0.0, 6.0, 0.0, 0.0, 0.0];
        let end = [0.0, 0.0, 0.0, 0.0, 6.0];
        let (s, e, _) = best_span(&start, &end, &ALL, 2).unwrap();
        assert!(e - s < 2);
    }

    #[test]
    fn test_no_context_tokens() {
        let start = [1.0, 2.0];
        let end = [1.0, 2.0];
        assert!(best_span(&start, &end, &[false, false], 15).is_none());
        assert!(best_span(&[], &[], &[], 15).is_none());
    }

    #[test]
    fn test_masked_softmax_sums_to_one() {
        let probs = masked_softmax(&[1.0, 2.0, 3.0], &[true, false, true]).unwrap();
        assert_eq!(probs[1], 0.0);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[0]);
    }

    #[tokio::test]
    async fn test_disabled_by_config() {
        let config = ExtractorConfig {
            enabled: false,
            ..ExtractorConfig::default()
        };
        assert!(!create_extractor(&config).await.is_enabled());
    }

    #[tokio::test]
    async fn test_missing_model_dir_disables() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractorConfig {
            model_dir: Some(dir.path().to_path_buf()),
            ..ExtractorConfig::default()
        };
        assert!(!create_extractor(&config).await.is_enabled());
    }
}
