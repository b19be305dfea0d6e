//! The `infralens models` command for managing the CLIP model files.

use clap::{Args, Subcommand};
use infralens_core::embedding::{TEXT_MODEL_FILENAME, TOKENIZER_FILENAME, VISION_MODEL_FILENAME};
use infralens_core::pipeline::content_hash;
use infralens_core::Config;
use std::path::{Path, PathBuf};

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download the configured CLIP model (vision + text encoder + tokenizer)
    Download,

    /// List model files and whether the classifier can run
    List,

    /// Show model directory path
    Path,

    /// Recompute checksums of downloaded files, removing corrupt ones
    Verify,
}

/// Where a model name is fetched from.
struct ModelSource {
    name: &'static str,
    repo: &'static str,
}

const MODEL_SOURCES: &[ModelSource] = &[
    ModelSource {
        name: "clip-vit-base-patch32",
        repo: "Xenova/clip-vit-base-patch32",
    },
    ModelSource {
        name: "clip-vit-base-patch16",
        repo: "Xenova/clip-vit-base-patch16",
    },
];

/// Remote path inside the repo, and local filename.
const MODEL_FILES: &[(&str, &str)] = &[
    ("onnx/vision_model.onnx", VISION_MODEL_FILENAME),
    ("onnx/text_model.onnx", TEXT_MODEL_FILENAME),
    ("tokenizer.json", TOKENIZER_FILENAME),
];

/// Extension of the checksum file written next to each download.
const CHECKSUM_EXTENSION: &str = "blake3";

/// Extension of an in-progress download, renamed away once complete.
const PARTIAL_EXTENSION: &str = "part";

fn find_source(model: &str) -> Option<&'static ModelSource> {
    MODEL_SOURCES.iter().find(|source| source.name == model)
}

/// `path` with `.extension` appended to its full file name.
fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

/// Path of the checksum file recorded for `path`.
fn checksum_path(path: &Path) -> PathBuf {
    sibling(path, CHECKSUM_EXTENSION)
}

/// State of a downloaded file against its recorded digest.
#[derive(Debug, PartialEq)]
enum Integrity {
    Intact,
    Unrecorded,
    Corrupt { expected: String, actual: String },
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;

    match args.command {
        ModelsCommand::Download => download(&config).await?,
        ModelsCommand::List => list(&config),
        ModelsCommand::Path => println!("{}", config.embedding_model_dir().display()),
        ModelsCommand::Verify => verify(&config)?,
    }

    Ok(())
}

/// Download every missing file of the configured model, recording its checksum.
async fn download(config: &Config) -> anyhow::Result<()> {
    let model = &config.embedding.model;
    let Some(source) = find_source(model) else {
        let known: Vec<&str> = MODEL_SOURCES.iter().map(|s| s.name).collect();
        anyhow::bail!(
            "No download source for model {model:?}.\n  Known models: {}",
            known.join(", ")
        );
    };

    let model_dir = config.embedding_model_dir();
    std::fs::create_dir_all(&model_dir)?;
    let client = reqwest::Client::new();

    for (remote, local) in MODEL_FILES {
        let dest = model_dir.join(local);
        if dest.exists() {
            tracing::info!("{} already exists at {:?}", local, dest);
            continue;
        }

        let url = format!("https://huggingface.co/{}/resolve/main/{}", source.repo, remote);
        tracing::info!("Downloading {}...", local);
        tracing::info!("  Source: {}", url);
        tracing::info!("  Destination: {:?}", dest);

        download_file(&client, &url, &dest).await?;
        record_checksum(&dest)?;

        let file_size = std::fs::metadata(&dest)?.len();
        tracing::info!(
            "  {} complete ({:.1} MB)",
            local,
            file_size as f64 / (1024.0 * 1024.0)
        );
    }

    tracing::info!("All downloads complete.");
    Ok(())
}

/// Print per-file status and whether classification can run.
fn list(config: &Config) {
    let model_dir = config.embedding_model_dir();
    println!("Model: {}", config.embedding.model);
    println!("  Directory: {}\n", model_dir.display());

    let mut ready = true;
    for (_, local) in MODEL_FILES {
        let path = model_dir.join(local);
        let status = match (path.exists(), checksum_path(&path).exists()) {
            (true, true) => "ready",
            (true, false) => "ready (no checksum)",
            (false, _) => {
                ready = false;
                "not installed"
            }
        };
        println!("    - {:30} {}", local, status);
    }

    println!();
    if ready {
        println!("Classifier: ready");
    } else {
        println!("Classifier: unavailable");
        println!("Run `infralens models download` to download required models.");
    }
}

/// Check every downloaded file against its recorded checksum.
///
/// Corrupt files and their checksums are removed so `download` fetches them again.
fn verify(config: &Config) -> anyhow::Result<()> {
    let model_dir = config.embedding_model_dir();
    let mut corrupt = 0usize;

    for (_, local) in MODEL_FILES {
        let path = model_dir.join(local);
        if !path.exists() {
            println!("    - {:30} not installed", local);
            continue;
        }

        match check_integrity(&path)? {
            Integrity::Intact => println!("    - {:30} ok", local),
            Integrity::Unrecorded => println!("    - {:30} no checksum recorded", local),
            Integrity::Corrupt { expected, actual } => {
                corrupt += 1;
                let _ = std::fs::remove_file(&path);
                let _ = std::fs::remove_file(checksum_path(&path));
                println!("    - {:30} CORRUPT (removed)", local);
                tracing::error!("{local}: recorded {expected}, found {actual}");
            }
        }
    }

    if corrupt > 0 {
        anyhow::bail!(
            "{corrupt} model file(s) failed verification. Run `infralens models download` again."
        );
    }
    Ok(())
}

/// Rehash `path` and compare against its sidecar.
fn check_integrity(path: &Path) -> anyhow::Result<Integrity> {
    let expected = match std::fs::read_to_string(checksum_path(path)) {
        Ok(recorded) => recorded.trim().to_string(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Integrity::Unrecorded),
        Err(e) => return Err(e.into()),
    };

    let actual = content_hash(path)
        .map_err(|e| anyhow::anyhow!("Cannot hash {}: {e}", path.display()))?;
    if actual == expected {
        Ok(Integrity::Intact)
    } else {
        Ok(Integrity::Corrupt { expected, actual })
    }
}

/// Stream a URL to disk.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    write_chunks(response.bytes_stream(), dest, total_size)
        .await
        .map_err(|e| anyhow::anyhow!("Download of {url} failed: {e}"))
}

/// Write a chunk stream to `dest` through a `.part` file.
///
/// `dest` only appears once every chunk is on disk; on any error the partial
/// file is removed.
async fn write_chunks<S, B, E>(
    chunks: S,
    dest: &Path,
    total_size: Option<u64>,
) -> anyhow::Result<()>
where
    S: futures_util::Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let partial = sibling(dest, PARTIAL_EXTENSION);
    let written = write_partial(chunks, &partial, total_size).await;
    match written {
        Ok(()) => {
            tokio::fs::rename(&partial, dest).await?;
            Ok(())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            Err(e)
        }
    }
}

async fn write_partial<S, B, E>(
    chunks: S,
    partial: &Path,
    total_size: Option<u64>,
) -> anyhow::Result<()>
where
    S: futures_util::Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::File::create(partial).await?;
    let mut chunks = std::pin::pin!(chunks);
    let mut downloaded: u64 = 0;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        let bytes = chunk.as_ref();
        file.write_all(bytes).await?;
        downloaded += bytes.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < bytes.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await?;
    Ok(())
}

/// Hash a freshly downloaded file and write the digest next to it.
fn record_checksum(path: &Path) -> anyhow::Result<String> {
    let hash = content_hash(path)
        .map_err(|e| anyhow::anyhow!("Checksum computation failed for {}: {e}", path.display()))?;
    std::fs::write(checksum_path(path), format!("{hash}\n"))?;
    tracing::debug!("  Checksum recorded: {}…", &hash[..16]);
    Ok(hash)
}
