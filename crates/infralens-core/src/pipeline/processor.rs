//! Pipeline orchestration - wires together all processing stages.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{self, Stream, StreamExt};
use image::DynamicImage;
use tokio::time::timeout;

use crate::classifier::{Decision, LabelSets, SimilarityOracle, TriageClassifier};
use crate::config::{ClassifierConfig, Config};
use crate::embedding::ClipOracle;
use crate::error::{ClassifyError, PipelineError};
use crate::types::ClassifiedImage;

use super::decode::{format_name, ImageDecoder};
use super::discovery::{DiscoveredFile, FileDiscovery};
use super::hash::content_hash_bytes;
use super::validate::Validator;

/// The main image processor that orchestrates the full pipeline.
///
/// Without a loaded oracle every image fails with
/// [`ClassifyError::OracleUnavailable`].
pub struct ImageProcessor<O = ClipOracle> {
    decoder: ImageDecoder,
    validator: Validator,
    discovery: FileDiscovery,
    labels: Arc<LabelSets>,
    thresholds: ClassifierConfig,
    classify_timeout_ms: u64,
    parallel_workers: usize,
    classifier: Option<Arc<TriageClassifier<O>>>,
}

impl ImageProcessor<ClipOracle> {
    /// Create a processor with the default label sets and no oracle loaded yet.
    pub fn new(config: &Config) -> Self {
        Self::build(config)
    }

    /// Load the CLIP oracle from the configured model directory.
    pub fn load_oracle(&mut self, config: &Config) -> Result<(), PipelineError> {
        let oracle = ClipOracle::load(&config.embedding, &config.model_dir(), &self.labels)?;
        self.classifier = Some(Arc::new(TriageClassifier::new(
            oracle,
            Arc::clone(&self.labels),
            self.thresholds,
        )));
        Ok(())
    }
}

impl<O: SimilarityOracle + 'static> ImageProcessor<O> {
    /// Create a processor around an already constructed oracle.
    pub fn with_oracle(config: &Config, oracle: O) -> Self {
        let mut processor = Self::build(config);
        processor.classifier = Some(Arc::new(TriageClassifier::new(
            oracle,
            Arc::clone(&processor.labels),
            processor.thresholds,
        )));
        processor
    }

    fn build(config: &Config) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            validator: Validator::new(config.limits.clone()),
            discovery: FileDiscovery::new(&config.processing),
            labels: Arc::new(LabelSets::default()),
            thresholds: config.classifier,
            classify_timeout_ms: config.limits.classify_timeout_ms,
            parallel_workers: config.processing.parallel_workers.max(1),
            classifier: None,
        }
    }

    /// Whether an oracle is loaded and reports itself available.
    pub fn has_classifier(&self) -> bool {
        self.classifier
            .as_ref()
            .is_some_and(|c| c.oracle().is_available())
    }

    /// The label sets every stage scores against.
    pub fn labels(&self) -> &LabelSets {
        &self.labels
    }

    /// Process a single image through the full pipeline.
    pub async fn process(&self, path: &Path) -> Result<ClassifiedImage, PipelineError> {
        let start = Instant::now();
        tracing::debug!("Processing: {:?}", path);

        self.validator.validate(path)?;
        tracing::trace!("  Validate: {:?}", start.elapsed());

        let read_start = Instant::now();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot read file: {e}"),
            })?;
        let content_hash = content_hash_bytes(&bytes);
        tracing::trace!("  Read + hash: {:?}", read_start.elapsed());

        let decode_start = Instant::now();
        let decoded = self.decoder.decode_from_bytes(bytes, path).await?;
        tracing::trace!("  Decode: {:?}", decode_start.elapsed());

        let classify_start = Instant::now();
        let decision = self.classify_image(decoded.image, path).await?;
        tracing::trace!("  Classify: {:?}", classify_start.elapsed());

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let elapsed = start.elapsed();
        tracing::debug!(
            "Classified {:?} as {} ({}) in {:?}",
            file_name,
            decision.outcome(),
            decision.confidence(),
            elapsed
        );

        Ok(ClassifiedImage {
            file_path: path.to_path_buf(),
            file_name,
            content_hash,
            width: decoded.width,
            height: decoded.height,
            format: format_name(decoded.format),
            file_size: decoded.file_size,
            decision,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    /// Process many files with at most `processing.parallel_workers` in flight.
    ///
    /// Results come back in input order, each paired with its file.
    pub fn process_batch(
        &self,
        files: Vec<DiscoveredFile>,
    ) -> impl Stream<Item = (DiscoveredFile, Result<ClassifiedImage, PipelineError>)> + '_ {
        stream::iter(files)
            .map(move |file| async move {
                let result = self.process(&file.path).await;
                (file, result)
            })
            .buffered(self.parallel_workers)
    }

    /// Run the three-stage policy on the blocking pool, bounded by `classify_timeout_ms`.
    ///
    /// `path` is only used for error context.
    pub async fn classify_image(
        &self,
        image: DynamicImage,
        path: &Path,
    ) -> Result<Decision, PipelineError> {
        let classifier = self
            .classifier
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| PipelineError::Classify {
                path: path.to_path_buf(),
                source: ClassifyError::OracleUnavailable("model not loaded".to_string()),
            })?;

        let timeout_ms = self.classify_timeout_ms;
        timeout(
            Duration::from_millis(timeout_ms),
            tokio::task::spawn_blocking(move || classifier.classify(&image)),
        )
        .await
        .map_err(|_| PipelineError::Timeout {
            path: path.to_path_buf(),
            stage: "classify".to_string(),
            timeout_ms,
        })?
        .map_err(|e| PipelineError::Model {
            message: format!("Classification task failed: {e}"),
        })?
        .map_err(|source| PipelineError::Classify {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Discover all image files at a path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        self.discovery.discover(path)
    }
}
