//! InfraLens Core - zero-shot triage of infrastructure-maintenance photos.
//!
//! A photo goes through a three-stage decision policy on top of a
//! vision-language similarity oracle (CLIP by default) and comes out as one of
//! three outcomes: unrelated to infrastructure, low confidence, or a
//! maintenance category such as a leak, a crack or exposed wiring.
//!
//! # Architecture
//!
//! ```text
//! Image → Validate → Hash → Decode → Gate → (Confirm) → Main labels → JSON
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use infralens_core::{Config, ImageProcessor};
//!
//! #[tokio::main]
//! async fn main() -> infralens_core::Result<()> {
//!     let config = Config::load()?;
//!     let mut processor = ImageProcessor::new(&config);
//!     processor.load_oracle(&config)?;
//!
//!     let record = processor.process("./site/leak.jpg".as_ref()).await?;
//!     println!("{}: {}", record.decision.outcome(), record.decision.confidence());
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod embedding;
pub mod error;
pub mod math;
pub mod output;
pub mod pipeline;
pub mod types;

pub use classifier::{
    Confidence, Decision, GateScores, LabelScore, LabelSets, LowConfidenceReason, Predictions,
    SimilarityOracle, TriageClassifier,
};
pub use config::Config;
pub use embedding::ClipOracle;
pub use error::{ClassifyError, ConfigError, InfraLensError, PipelineError, PipelineResult, Result};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::ImageProcessor;
pub use types::{ClassifiedImage, ProcessingStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
