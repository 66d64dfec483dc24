//! Embedding provider interface.
//!
//! The index never computes embeddings. Callers bring a provider (a model
//! server, an API client, an in-process model) behind this trait and hand the
//! resulting vectors to [`VectorIndex::insert`](crate::VectorIndex::insert).
//! Collection jobs historically call [`TextEmbedder::embed_many`] with ten
//! texts at a time, so providers with a real batch endpoint should override
//! the default one-by-one implementation.

use thiserror::Error;

use crate::types::Dimensions;

/// Failure reported by an embedding provider.
///
/// Deliberately separate from [`IndexError`](crate::IndexError): a provider
/// outage is not an index failure and callers retry them differently.
#[derive(Error, Debug)]
#[error(
    "Embedding generation failed: {reason}\nSuggestion: Verify the provider is reachable and produces vectors of the index dimension count"
)]
pub struct EmbedError {
    pub reason: String,
}

impl EmbedError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A source of fixed-length embedding vectors for text.
pub trait TextEmbedder: Send + Sync {
    /// Embeds a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Embeds a batch of texts, one vector per input, in order.
    fn embed_many(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Dimension count of every vector this provider produces.
    fn dimensions(&self) -> Dimensions;
}

/// Deterministic embedder for tests: spreads text bytes across the vector
/// and normalizes, so equal texts embed equally and the output is unit
/// length.
#[cfg(test)]
pub(crate) struct MockTextEmbedder {
    dimensions: Dimensions,
}

#[cfg(test)]
impl MockTextEmbedder {
    pub fn new(dimensions: Dimensions) -> Self {
        Self { dimensions }
    }
}

#[cfg(test)]
impl TextEmbedder for MockTextEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let dims = self.dimensions.get();
        let mut vector = vec![0.0f32; dims];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % dims] += f32::from(byte) / 255.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}
