//! Pre-computed label embeddings for fast scoring.
//!
//! The label bank stores a flat N×D matrix of text embeddings (one row per
//! distinct label text) so each classification only runs the vision encoder.

use std::collections::HashMap;

use crate::error::PipelineError;
use crate::math::dot;

use super::text_encoder::ClipTextEncoder;

/// Cached label embeddings, keyed by label text.
///
/// Stores a single flat matrix (N × D, row-major).
#[derive(Clone, Default)]
pub struct LabelBank {
    /// Flat matrix: N × D stored row-major.
    matrix: Vec<f32>,
    embedding_dim: usize,
    rows: HashMap<String, usize>,
}

impl LabelBank {
    /// Create an empty label bank. The dimension is fixed by the first insert.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Encode every distinct label of the given sets in one batch.
    pub fn encode_all(
        label_sets: &[&[String]],
        text_encoder: &ClipTextEncoder,
    ) -> Result<Self, PipelineError> {
        let mut bank = Self::empty();
        let labels: Vec<String> = label_sets.iter().flat_map(|set| set.iter()).cloned().collect();
        bank.encode_missing(&labels, text_encoder)?;
        tracing::info!(
            "Label bank ready: {} labels x {} dims",
            bank.len(),
            bank.embedding_dim
        );
        Ok(bank)
    }

    /// Encode the labels not yet in the bank.
    pub fn encode_missing(
        &mut self,
        labels: &[String],
        text_encoder: &ClipTextEncoder,
    ) -> Result<(), PipelineError> {
        let missing = self.missing(labels);
        if missing.is_empty() {
            return Ok(());
        }
        tracing::debug!("Encoding {} label prompt(s)", missing.len());
        let embeddings = text_encoder.encode_batch(&missing)?;
        if embeddings.len() != missing.len() {
            return Err(PipelineError::Model {
                message: format!(
                    "Text encoder returned {} embeddings for {} labels",
                    embeddings.len(),
                    missing.len()
                ),
            });
        }
        for (label, embedding) in missing.into_iter().zip(embeddings) {
            self.insert(label, &embedding)?;
        }
        Ok(())
    }

    /// Distinct labels from `labels` that have no embedding yet, in first-seen order.
    pub fn missing(&self, labels: &[String]) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for label in labels {
            if !self.rows.contains_key(label) && !missing.contains(label) {
                missing.push(label.clone());
            }
        }
        missing
    }

    /// Add one label embedding. Re-inserting a known label is a no-op.
    pub fn insert(&mut self, label: String, embedding: &[f32]) -> Result<(), PipelineError> {
        if self.rows.contains_key(&label) {
            return Ok(());
        }
        if self.rows.is_empty() {
            self.embedding_dim = embedding.len();
        }
        if embedding.is_empty() || embedding.len() != self.embedding_dim {
            return Err(PipelineError::Model {
                message: format!(
                    "Cannot add label {label:?}: dimension mismatch ({} vs {})",
                    embedding.len(),
                    self.embedding_dim
                ),
            });
        }
        self.rows.insert(label, self.rows.len());
        self.matrix.extend_from_slice(embedding);
        Ok(())
    }

    /// Cosine similarity of the image embedding to each label, in label order.
    ///
    /// Both sides are L2-normalized, so the dot product is the cosine.
    /// Returns `None` if any label is not in the bank.
    pub fn similarities(&self, image_embedding: &[f32], labels: &[String]) -> Option<Vec<f32>> {
        labels
            .iter()
            .map(|label| {
                let row = *self.rows.get(label)?;
                let offset = row * self.embedding_dim;
                Some(dot(
                    image_embedding,
                    &self.matrix[offset..offset + self.embedding_dim],
                ))
            })
            .collect()
    }

    /// Number of distinct labels stored.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}
