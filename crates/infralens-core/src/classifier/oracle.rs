//! The embedding-similarity oracle the classifier consumes.

use std::sync::Arc;

use image::DynamicImage;

use crate::error::ClassifyError;

/// Scores an image against an ordered label set.
///
/// Implementations return a probability distribution (softmax over
/// image-text similarity logits) with exactly one entry per label, in label
/// order. Calls are blocking and may be made concurrently from several
/// threads.
pub trait SimilarityOracle: Send + Sync {
    /// Whether the underlying model is loaded and callable.
    fn is_available(&self) -> bool;

    /// Probability of each label for this image.
    fn probabilities(
        &self,
        image: &DynamicImage,
        labels: &[String],
    ) -> Result<Vec<f32>, ClassifyError>;
}

impl<O: SimilarityOracle + ?Sized> SimilarityOracle for &O {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn probabilities(
        &self,
        image: &DynamicImage,
        labels: &[String],
    ) -> Result<Vec<f32>, ClassifyError> {
        (**self).probabilities(image, labels)
    }
}

impl<O: SimilarityOracle + ?Sized> SimilarityOracle for Arc<O> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn probabilities(
        &self,
        image: &DynamicImage,
        labels: &[String],
    ) -> Result<Vec<f32>, ClassifyError> {
        (**self).probabilities(image, labels)
    }
}

impl<O: SimilarityOracle + ?Sized> SimilarityOracle for Box<O> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn probabilities(
        &self,
        image: &DynamicImage,
        labels: &[String],
    ) -> Result<Vec<f32>, ClassifyError> {
        (**self).probabilities(image, labels)
    }
}
