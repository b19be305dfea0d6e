//! Classifier setup: input checks, config, and model loading.

use infralens_core::{ClipOracle, Config, ImageProcessor, OutputFormat as CoreOutputFormat};

use super::{ClassifyArgs, ClassifyContext};

/// Validate input, load config and the CLIP model, and pick the output format.
///
/// A missing or broken model is not an error here: the processor then reports
/// every image as unclassifiable, which the callers turn into a clear failure.
pub fn setup_classifier(args: &ClassifyArgs) -> anyhow::Result<ClassifyContext> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    let config = Config::load()?;
    let output_format = resolve_format(args, &config);

    let mut processor = ImageProcessor::new(&config);
    if ClipOracle::model_exists(&config.embedding, &config.model_dir()) {
        match processor.load_oracle(&config) {
            Ok(()) => tracing::info!("Classifier ready ({})", config.embedding.model),
            Err(e) => tracing::warn!("Failed to load CLIP model: {e}"),
        }
    } else {
        tracing::warn!(
            "CLIP model not found in {:?}. Run `infralens models download` first.",
            config.embedding_model_dir()
        );
    }

    Ok(ClassifyContext {
        processor,
        output_format,
        pretty: config.output.pretty,
    })
}

/// `--format` wins; otherwise `[output] format`, falling back to JSON.
pub(crate) fn resolve_format(args: &ClassifyArgs, config: &Config) -> CoreOutputFormat {
    if let Some(format) = args.format {
        return format.into();
    }
    CoreOutputFormat::parse(&config.output.format).unwrap_or_else(|| {
        tracing::warn!(
            "Unknown output format {:?} in config, using json",
            config.output.format
        );
        CoreOutputFormat::Json
    })
}
