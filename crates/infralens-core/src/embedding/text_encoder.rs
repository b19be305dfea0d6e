//! CLIP text encoder for generating label embeddings.
//!
//! Loads the CLIP text ONNX model and tokenizer, encodes text strings to
//! vectors aligned with the vision encoder's projected space.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;

/// CLIP's context length.
const MAX_LENGTH: usize = 77;

/// `<|endoftext|>`, which the CLIP tokenizer also uses for padding.
const DEFAULT_PAD_ID: i64 = 49407;

/// Name of the projected embedding output of the text model.
const TEXT_EMBEDS_OUTPUT: &str = "text_embeds";

/// CLIP text encoder wrapper.
///
/// Uses the same `Mutex<Session>` pattern as the vision encoder.
pub struct ClipTextEncoder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    pad_id: i64,
    /// Whether the exported graph takes an `attention_mask` input.
    wants_attention_mask: bool,
}

impl ClipTextEncoder {
    /// Load the text encoder and tokenizer from explicit paths.
    pub fn load(text_model_path: &Path, tokenizer_path: &Path) -> Result<Self, PipelineError> {
        if !text_model_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "Text encoder not found at {:?}. Run `infralens models download` first.",
                    text_model_path
                ),
            });
        }

        if !tokenizer_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "Tokenizer not found at {:?}. Run `infralens models download` first.",
                    tokenizer_path
                ),
            });
        }

        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(text_model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load text encoder model: {e}"),
            })?;

        let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path).map_err(|e| {
            PipelineError::Model {
                message: format!("Failed to load tokenizer: {e}"),
            }
        })?;

        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id as i64)
            .unwrap_or(DEFAULT_PAD_ID);

        let wants_attention_mask = session
            .inputs()
            .iter()
            .any(|i| i.name() == "attention_mask");

        tracing::debug!(
            "Loaded CLIP text encoder (inputs: {:?}, outputs: {:?})",
            session
                .inputs()
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>(),
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            pad_id,
            wants_attention_mask,
        })
    }

    /// Encode a batch of text strings to normalized embeddings.
    ///
    /// Returns one vector per input text, in input order.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let batch_size = texts.len();
        if batch_size == 0 {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| PipelineError::Model {
                message: format!("Tokenization failed: {e}"),
            })?;

        // Pad to the longest sequence in the batch, capped at CLIP's context length.
        let seq_len = encodings
            .iter()
            .map(|e| e.get_attention_mask().iter().filter(|&&m| m == 1).count())
            .max()
            .unwrap_or(1)
            .clamp(1, MAX_LENGTH);

        let mut input_ids = vec![self.pad_id; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let tokens = encoding
                .get_ids()
                .iter()
                .zip(encoding.get_attention_mask())
                .filter(|(_, m)| **m == 1)
                .take(seq_len);
            for (j, (&id, _)) in tokens.enumerate() {
                input_ids[i * seq_len + j] = id as i64;
                attention_mask[i * seq_len + j] = 1;
            }
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let input_ids_value =
            Value::from_array((shape.clone(), input_ids)).map_err(|e| PipelineError::Model {
                message: format!("Failed to create input_ids tensor: {e}"),
            })?;

        let mut session = self.session.lock().map_err(|e| PipelineError::Model {
            message: format!("Text encoder lock poisoned: {e}"),
        })?;

        let outputs = if self.wants_attention_mask {
            let mask_value =
                Value::from_array((shape, attention_mask)).map_err(|e| PipelineError::Model {
                    message: format!("Failed to create attention_mask tensor: {e}"),
                })?;
            session.run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => mask_value
            ])
        } else {
            session.run(ort::inputs!["input_ids" => input_ids_value])
        }
        .map_err(|e| PipelineError::Model {
            message: format!("Text encoder inference failed: {e}"),
        })?;

        let text_embeds = outputs
            .iter()
            .find(|(name, _)| *name == TEXT_EMBEDS_OUTPUT)
            .ok_or_else(|| PipelineError::Model {
                message: format!("Text encoder did not produce {TEXT_EMBEDS_OUTPUT}"),
            })?;

        let (_shape, data) =
            text_embeds
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::Model {
                    message: format!("Failed to extract {TEXT_EMBEDS_OUTPUT}: {e}"),
                })?;

        let embedding_dim = data.len() / batch_size;
        if embedding_dim == 0 {
            return Err(PipelineError::Model {
                message: format!("Text encoder returned an empty {TEXT_EMBEDS_OUTPUT} tensor"),
            });
        }
        let embeddings: Vec<Vec<f32>> = data
            .chunks(embedding_dim)
            .map(crate::math::l2_normalize)
            .collect();

        Ok(embeddings)
    }
}
