//! Cheap input checks before an image is read and decoded.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Number of header bytes inspected when sniffing the format.
const HEADER_LEN: usize = 12;

/// Validates files before processing.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check that the file exists, fits the size limit and looks like an image.
    ///
    /// Returns the sniffed format name.
    pub fn validate(&self, path: &Path) -> Result<&'static str, PipelineError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::FileNotFound(path.to_path_buf()),
            _ => PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot read metadata: {e}"),
            },
        })?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let header = read_header(path)?;
        sniff_format(&header).ok_or_else(|| PipelineError::Decode {
            path: path.to_path_buf(),
            message: "Unrecognized image format (invalid magic bytes)".to_string(),
        })
    }
}

fn read_header(path: &Path) -> Result<Vec<u8>, PipelineError> {
    let file = std::fs::File::open(path).map_err(|e| PipelineError::Decode {
        path: path.to_path_buf(),
        message: format!("Cannot open file: {e}"),
    })?;

    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read file header: {e}"),
        })?;

    if header.len() < 4 {
        return Err(PipelineError::Decode {
            path: path.to_path_buf(),
            message: "File too small to be a valid image".to_string(),
        });
    }
    Ok(header)
}

/// Identify an image format from its leading bytes.
pub fn sniff_format(header: &[u8]) -> Option<&'static str> {
    const PREFIXES: [(&[u8], &str); 7] = [
        (&[0xFF, 0xD8, 0xFF], "jpeg"),
        (&[0x89, b'P', b'N', b'G'], "png"),
        (b"GIF8", "gif"),
        (b"BM", "bmp"),
        (&[b'I', b'I', 0x2A, 0x00], "tiff"),
        (&[b'M', b'M', 0x00, 0x2A], "tiff"),
        (b"RIFF", "webp"),
    ];

    let (_, name) = PREFIXES
        .iter()
        .find(|(magic, _)| header.starts_with(magic))?;

    // RIFF is shared with WAV/AVI; require the WEBP fourcc when it's present.
    if *name == "webp" && header.len() >= HEADER_LEN && &header[8..12] != b"WEBP" {
        return None;
    }
    Some(*name)
}
