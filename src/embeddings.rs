use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A fixed-length vector representing the semantic content of a text.
///
/// Every embedding handed to the store or the search is unit-normalized
/// (L2 norm 1), which lets the search score pairs with a plain dot product
/// instead of a full cosine computation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding { values }
    }

    /// Number of dimensions in the vector.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Scale the vector to unit length. A zero vector is returned unchanged
    /// rather than filled with NaN.
    pub fn normalized(mut self) -> Self {
        let norm: f32 = self.values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
        self
    }

    /// Dot product with another vector of the same dimensionality.
    ///
    /// For unit-normalized vectors this equals their cosine similarity.
    pub fn dot(&self, other: &Embedding) -> f32 {
        debug_assert_eq!(self.dim(), other.dim());
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }
}

/// Collaborator that turns text into embedding vectors.
///
/// Implementations must return unit-normalized vectors of a fixed
/// dimensionality; [`crate::ollama::OllamaClient`] normalizes on behalf of
/// models that do not guarantee it.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_has_unit_length() {
        let embedding = Embedding::new(vec![3.0, 4.0]).normalized();
        let norm: f32 = embedding.values.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((embedding.values[0] - 0.6).abs() < 1e-6);
        assert!((embedding.values[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalizing_zero_vector_leaves_it_unchanged() {
        let embedding = Embedding::new(vec![0.0, 0.0, 0.0]).normalized();
        assert_eq!(embedding.values, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn dot_of_identical_unit_vectors_is_one() {
        let a = Embedding::new(vec![1.0, 2.0, 2.0]).normalized();
        assert!((a.dot(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn dot_of_orthogonal_vectors_is_zero() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0]);
        assert_eq!(a.dot(&b), 0.0);
    }
}
