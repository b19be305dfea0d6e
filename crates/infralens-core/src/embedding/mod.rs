//! CLIP embedding oracle.
//!
//! Runs the CLIP ViT-B/32 vision and text encoders locally via ONNX Runtime
//! and turns image-text cosine similarities into label probabilities.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infralens_core::{ClipOracle, Config, LabelSets};
//!
//! let config = Config::default();
//! let labels = LabelSets::default();
//! let oracle = ClipOracle::load(&config.embedding, &config.model_dir(), &labels)?;
//! let probs = oracle.probabilities(&image, labels.main())?;
//! // probs sums to 1.0, one entry per label
//! ```

pub(crate) mod label_bank;
pub(crate) mod preprocess;
pub(crate) mod text_encoder;
pub(crate) mod vision;

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use image::DynamicImage;

use crate::classifier::{LabelSets, SimilarityOracle};
use crate::config::EmbeddingConfig;
use crate::error::{ClassifyError, PipelineError};
use crate::math::softmax;

pub use self::label_bank::LabelBank;
use self::preprocess::preprocess;
use self::text_encoder::ClipTextEncoder;
use self::vision::ClipVisionSession;

/// The vision encoder ONNX model filename.
pub const VISION_MODEL_FILENAME: &str = "vision_model.onnx";

/// The text encoder ONNX model filename.
pub const TEXT_MODEL_FILENAME: &str = "text_model.onnx";

/// The tokenizer filename.
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Every file the oracle needs, relative to the model directory.
pub const MODEL_FILES: [&str; 3] = [VISION_MODEL_FILENAME, TEXT_MODEL_FILENAME, TOKENIZER_FILENAME];

/// Zero-shot similarity oracle backed by CLIP.
pub struct ClipOracle {
    vision: ClipVisionSession,
    text: ClipTextEncoder,
    bank: RwLock<LabelBank>,
    image_size: u32,
    logit_scale: f32,
}

impl ClipOracle {
    /// Load both encoders from `{model_dir}/{model}/` and pre-encode the label sets.
    pub fn load(
        config: &EmbeddingConfig,
        model_dir: &Path,
        labels: &LabelSets,
    ) -> Result<Self, PipelineError> {
        let dir = model_dir.join(&config.model);
        let vision_path = dir.join(VISION_MODEL_FILENAME);

        if !vision_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "Vision model not found at {:?}. Run `infralens models download` first.",
                    vision_path
                ),
            });
        }

        tracing::info!("Loading CLIP model from {:?}", dir);
        let vision = ClipVisionSession::load(&vision_path)?;
        let text = ClipTextEncoder::load(
            &dir.join(TEXT_MODEL_FILENAME),
            &dir.join(TOKENIZER_FILENAME),
        )?;
        let bank = LabelBank::encode_all(&labels.all(), &text)?;
        tracing::info!("CLIP model loaded successfully");

        Ok(Self {
            vision,
            text,
            bank: RwLock::new(bank),
            image_size: config.image_size,
            logit_scale: config.logit_scale,
        })
    }

    /// Check whether all model files exist on disk.
    pub fn model_exists(config: &EmbeddingConfig, model_dir: &Path) -> bool {
        Self::model_paths(config, model_dir)
            .iter()
            .all(|path| path.exists())
    }

    /// Expected on-disk paths of every model file.
    pub fn model_paths(config: &EmbeddingConfig, model_dir: &Path) -> Vec<PathBuf> {
        let dir = model_dir.join(&config.model);
        MODEL_FILES.iter().map(|name| dir.join(name)).collect()
    }

    /// Projected, L2-normalized embedding of an image.
    pub fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>, PipelineError> {
        let tensor = preprocess(image, self.image_size);
        self.vision.embed(&tensor)
    }

    /// Cosine similarities of an image embedding to each label, encoding unseen labels.
    fn similarities(
        &self,
        image_embedding: &[f32],
        labels: &[String],
    ) -> Result<Vec<f32>, PipelineError> {
        {
            let bank = self.bank.read().map_err(|e| PipelineError::Model {
                message: format!("Label bank lock poisoned: {e}"),
            })?;
            if image_embedding.len() != bank.embedding_dim() && !bank.is_empty() {
                return Err(PipelineError::Model {
                    message: format!(
                        "Image embedding has {} dims, label bank has {}",
                        image_embedding.len(),
                        bank.embedding_dim()
                    ),
                });
            }
            if let Some(sims) = bank.similarities(image_embedding, labels) {
                return Ok(sims);
            }
        }

        let mut bank = self.bank.write().map_err(|e| PipelineError::Model {
            message: format!("Label bank lock poisoned: {e}"),
        })?;
        bank.encode_missing(labels, &self.text)?;
        bank.similarities(image_embedding, labels)
            .ok_or_else(|| PipelineError::Model {
                message: "Label bank is missing freshly encoded labels".to_string(),
            })
    }
}

impl SimilarityOracle for ClipOracle {
    fn is_available(&self) -> bool {
        true
    }

    fn probabilities(
        &self,
        image: &DynamicImage,
        labels: &[String],
    ) -> Result<Vec<f32>, ClassifyError> {
        let embedding = self
            .embed_image(image)
            .map_err(|e| ClassifyError::Oracle(e.to_string()))?;
        let sims = self
            .similarities(&embedding, labels)
            .map_err(|e| ClassifyError::Oracle(e.to_string()))?;
        let logits: Vec<f32> = sims.iter().map(|s| s * self.logit_scale).collect();
        Ok(softmax(&logits))
    }
}
