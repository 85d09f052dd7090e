//! Mock embedding provider using word and trigram hashing.

use crate::embeddings::provider::EmbeddingProvider;
use std::collections::HashMap;
use visionrag_core::AppResult;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "there", "where", "what", "when", "who", "did", "does", "video", "time",
];

/// Offline provider for tests and demos.
///
/// Deterministic and content dependent: texts sharing words land close
/// together. Punctuation is ignored, so "car?" and "car" match. Document
/// boilerplate ("video", "time") and question words are stop words.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash(bytes: &[u8], multiplier: u64) -> u64 {
        bytes
            .iter()
            .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(*b as u64))
    }

    fn generate_mock_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
            .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let idx = (Self::hash(trigram.as_bytes(), 37) as usize) % self.dimensions;
                embedding[idx] += (*freq as f32).sqrt();
            }

            let idx = (Self::hash(word.as_bytes(), 31) as usize) % self.dimensions;
            embedding[idx] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }
        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        Ok(self.generate_mock_embedding(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_unit_length_and_dimensions() {
        let provider = MockProvider::new(384);
        let embedding = provider.embed("a delivery truck at the loading dock").await.unwrap();
        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = MockProvider::new(384);
        let a = provider.embed("person walks by").await.unwrap();
        let b = provider.embed("person walks by").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_punctuation_and_boilerplate_ignored() {
        let provider = MockProvider::new(384);
        let question = provider.embed("Where is the car?").await.unwrap();
        let plain = provider.embed("car").await.unwrap();
        assert_eq!(question, plain);

        let doc = provider.embed("Video v1, time 00:00:05: car").await.unwrap();
        assert_eq!(doc, plain);
    }

    #[tokio::test]
    async fn test_shared_words_are_closer() {
        let provider = MockProvider::new(384);
        let query = provider.embed("car").await.unwrap();
        let car = provider.embed("a car parked").await.unwrap();
        let person = provider.embed("a person walks by").await.unwrap();
        assert!(dot(&query, &car) > dot(&query, &person));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = MockProvider::new(16);
        let embedding = provider.embed("").await.unwrap();
        assert_eq!(embedding.len(), 16);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }
}
