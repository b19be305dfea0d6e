//! Image processing pipeline components.
//!
//! - **validate**: Existence, size limit and magic-byte checks
//! - **hash**: BLAKE3 content hashes
//! - **decode**: Decode images with a timeout and dimension limit
//! - **discovery**: Find image files in directories
//! - **processor**: Orchestrates the full pipeline, ending in classification

pub mod decode;
pub mod discovery;
pub mod hash;
pub mod processor;
pub mod validate;

pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use hash::{content_hash, content_hash_bytes};
pub use processor::ImageProcessor;
pub use validate::Validator;
