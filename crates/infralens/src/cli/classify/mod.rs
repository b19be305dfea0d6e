//! The `infralens classify` command.

mod batch;
mod setup;
pub mod types;

pub use types::OutputFormat;

use clap::Args;
use infralens_core::{ImageProcessor, OutputFormat as CoreOutputFormat, OutputWriter, PipelineError};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use batch::classify_batch;
use setup::setup_classifier;

/// Arguments for the `classify` command.
#[derive(Args, Debug, Default)]
pub struct ClassifyArgs {
    /// Image file or directory to classify
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to `[output] format` from the config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Skip images whose content hash is already in the output file
    #[arg(long)]
    pub skip_existing: bool,
}

/// Everything a run needs, assembled by `setup_classifier()`.
pub(crate) struct ClassifyContext {
    pub processor: ImageProcessor,
    pub output_format: CoreOutputFormat,
    pub pretty: bool,
}

/// Execute the classify command.
pub async fn execute(args: ClassifyArgs) -> anyhow::Result<()> {
    let ctx = setup_classifier(&args)?;

    let files = ctx.processor.discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!("Found {} image(s) to classify", files.len());

    if args.input.is_file() {
        classify_single(ctx, &args).await
    } else {
        classify_batch(ctx, &args, files).await.map(|_| ())
    }
}

/// Classify one file and print or write its record.
async fn classify_single(ctx: ClassifyContext, args: &ClassifyArgs) -> anyhow::Result<()> {
    let record = ctx
        .processor
        .process(&args.input)
        .await
        .map_err(with_hint)?;

    if let Some(output_path) = &args.output {
        let file = File::create(output_path)?;
        let mut writer = OutputWriter::new(BufWriter::new(file), ctx.output_format, ctx.pretty);
        writer.write(&record)?;
        writer.flush()?;
        tracing::info!("Output written to {:?}", output_path);
    } else {
        match ctx.output_format {
            CoreOutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
            CoreOutputFormat::JsonLines => println!("{}", serde_json::to_string(&record)?),
        }
    }

    Ok(())
}

/// Turn a pipeline error into a CLI error, pointing at the fix when the model is missing.
pub(crate) fn with_hint(e: PipelineError) -> anyhow::Error {
    if e.is_oracle_unavailable() {
        anyhow::anyhow!("{e}\n\n  Hint: Run `infralens models download` first.")
    } else {
        e.into()
    }
}
