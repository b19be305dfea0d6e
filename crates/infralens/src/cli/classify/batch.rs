//! Batch classification: directory traversal with progress, skip-existing, and streaming output.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use futures_util::StreamExt;
use infralens_core::output::{existing_hashes, parse_records};
use infralens_core::pipeline::{content_hash, DiscoveredFile};
use infralens_core::{OutputFormat, OutputWriter, ProcessingStats};

use super::{with_hint, ClassifyArgs, ClassifyContext};

/// Classify every discovered file, writing records as they complete for JSONL
/// and as one array at the end for JSON.
pub async fn classify_batch(
    ctx: ClassifyContext,
    args: &ClassifyArgs,
    files: Vec<DiscoveredFile>,
) -> anyhow::Result<ProcessingStats> {
    let existing = if args.skip_existing {
        load_existing_hashes(args.output.as_deref())?
    } else {
        HashSet::new()
    };
    if !existing.is_empty() {
        tracing::info!("Loaded {} existing hashes from output file", existing.len());
    }

    let progress = create_progress_bar(files.len() as u64);
    let mut stats = ProcessingStats::default();
    let start_time = Instant::now();
    let streaming = ctx.output_format == OutputFormat::JsonLines;
    let mut results = Vec::new();

    let mut file_writer = match (&args.output, streaming) {
        (Some(output_path), true) => {
            let file = if args.skip_existing && output_path.exists() {
                std::fs::OpenOptions::new().append(true).open(output_path)?
            } else {
                File::create(output_path)?
            };
            Some(OutputWriter::new(BufWriter::new(file), ctx.output_format, false))
        }
        _ => None,
    };

    let mut pending = Vec::with_capacity(files.len());
    for file in files {
        if !existing.is_empty() {
            if let Ok(hash) = content_hash(&file.path) {
                if existing.contains(&hash) {
                    stats.skipped += 1;
                    progress.inc(1);
                    continue;
                }
            }
        }
        pending.push(file);
    }

    let mut outcomes = std::pin::pin!(ctx.processor.process_batch(pending));
    while let Some((file, result)) = outcomes.next().await {
        match result {
            Ok(record) => {
                stats.record(&record.decision);
                if !streaming {
                    results.push(record);
                } else if let Some(writer) = &mut file_writer {
                    writer.write(&record)?;
                } else {
                    let line = serde_json::to_string(&record)?;
                    progress.suspend(|| println!("{line}"));
                }
            }
            Err(e) if e.is_oracle_unavailable() => {
                progress.finish_and_clear();
                return Err(with_hint(e));
            }
            Err(e) => {
                stats.failed += 1;
                tracing::error!("Failed: {:?} - {}", file.path, e);
            }
        }

        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = (stats.succeeded + stats.failed) as f64 / elapsed;
            progress.set_message(format!("{rate:.1} img/sec"));
        }
    }

    if let Some(writer) = &mut file_writer {
        writer.flush()?;
    }

    if !streaming {
        if let Some(output_path) = &args.output {
            // A JSON array can't be appended to, so earlier records are merged in.
            let mut records = Vec::new();
            if args.skip_existing && output_path.exists() {
                let content = std::fs::read_to_string(output_path)?;
                records = parse_records(&content);
                if records.is_empty() && !content.trim().is_empty() {
                    tracing::warn!(
                        "--skip-existing: failed to parse existing output at {:?}; \
                         earlier records will not be kept",
                        output_path
                    );
                }
            }
            records.extend(results);

            let file = File::create(output_path)?;
            let mut writer = OutputWriter::new(BufWriter::new(file), ctx.output_format, ctx.pretty);
            writer.write_all(&records)?;
            writer.flush()?;
        } else {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    if let Some(output_path) = &args.output {
        tracing::info!("Output written to {:?}", output_path);
    }

    stats.finish(start_time.elapsed());
    progress.finish_and_clear();
    for line in summary_lines(&stats) {
        eprintln!("{line}");
    }

    Ok(stats)
}

/// Content hashes already in the output file; empty without `--output`.
fn load_existing_hashes(output_path: Option<&Path>) -> anyhow::Result<HashSet<String>> {
    let Some(path) = output_path else {
        tracing::warn!("--skip-existing has no effect without --output");
        return Ok(HashSet::new());
    };
    Ok(existing_hashes(path)?)
}

/// Create a progress bar for batch classification.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Summary table printed to stderr after a batch run.
fn summary_lines(stats: &ProcessingStats) -> Vec<String> {
    let total = stats.succeeded + stats.failed + stats.skipped;
    let mut lines = vec![
        String::new(),
        "  ====================================".to_string(),
        "               Summary".to_string(),
        "  ====================================".to_string(),
        format!("    Succeeded:    {:>8}", stats.succeeded),
        format!("      Unrelated:      {:>6}", stats.non_infrastructure),
        format!("      Low conf.:      {:>6}", stats.low_confidence),
        format!("      Classified:     {:>6}", stats.classified),
    ];
    if stats.failed > 0 {
        lines.push(format!("    Failed:       {:>8}", stats.failed));
    }
    if stats.skipped > 0 {
        lines.push(format!("    Skipped:      {:>8}", stats.skipped));
    }
    lines.push("  ------------------------------------".to_string());
    lines.push(format!("    Total:        {:>8}", total));
    lines.push(format!("    Duration:     {:>7.1}s", stats.total_seconds));
    lines.push(format!("    Rate:         {:>7.1} img/sec", stats.images_per_second));
    lines.push("  ====================================".to_string());
    lines
}
