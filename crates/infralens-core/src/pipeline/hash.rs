//! BLAKE3 content hashing, used for skip-existing runs and model checksums.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Hex BLAKE3 digest of a file, streamed from disk.
pub fn content_hash(path: &Path) -> std::io::Result<String> {
    let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Hex BLAKE3 digest of an in-memory buffer.
pub fn content_hash_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_and_bytes_hash_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"hello infralens").unwrap();

        let from_file = content_hash(&path).unwrap();
        assert_eq!(from_file, content_hash_bytes(b"hello infralens"));
        assert_eq!(from_file.len(), 64);
    }

    #[test]
    fn test_hash_missing_file() {
        assert!(content_hash(Path::new("/nonexistent/file.bin")).is_err());
    }
}
