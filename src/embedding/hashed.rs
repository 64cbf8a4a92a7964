//! Deterministic offline embeddings from hashed words and character trigrams.
//!
//! Not semantically meaningful the way a neural model is, but vectors are
//! content-dependent and stable across runs, which is enough for local
//! development and for tests that must not download models.

use anyhow::Result;
use async_trait::async_trait;

use askdoc_core::embedding::Embedder;

pub const HASHED_DEFAULT_DIMS: usize = 256;

pub struct HashedProvider {
    dims: usize,
}

impl HashedProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let lower = text.to_lowercase();

        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2)
        {
            v[bucket(word.as_bytes(), 31, self.dims)] += 1.0;

            let chars: Vec<char> = word.chars().collect();
            for tri in chars.windows(3) {
                let tri: String = tri.iter().collect();
                v[bucket(tri.as_bytes(), 37, self.dims)] += 0.5;
            }
        }

        normalize_l2(v)
    }
}

fn bucket(bytes: &[u8], multiplier: u64, dims: usize) -> usize {
    let hash = bytes
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_mul(multiplier).wrapping_add(b as u64));
    (hash % dims as u64) as usize
}

fn normalize_l2(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl Embedder for HashedProvider {
    fn model_name(&self) -> &str {
        "hashed-trigram"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdoc_core::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_dimensions_and_normalization() {
        let p = HashedProvider::new(64);
        let v = p.embed("Minimum age of participants").await.unwrap();
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let p = HashedProvider::new(128);
        let a = p.embed("registration fee").await.unwrap();
        let b = p.embed("registration fee").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_related_text_scores_higher() {
        let p = HashedProvider::new(HASHED_DEFAULT_DIMS);
        let q = p.embed("What is the minimum age?").await.unwrap();
        let related = p
            .embed("Participants must meet the minimum age of 18 years.")
            .await
            .unwrap();
        let unrelated = p
            .embed("Prizes are paid by bank transfer within thirty days.")
            .await
            .unwrap();
        assert!(cosine_similarity(&q, &related) > cosine_similarity(&q, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let p = HashedProvider::new(16);
        let v = p.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
