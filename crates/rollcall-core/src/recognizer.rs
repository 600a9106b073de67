//! Embedding extraction seam.

use crate::frame::Frame;
use crate::types::{Embedding, Rect};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("face region could not be encoded")]
    NoFaceEncodable,
    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Maps a face region of a frame to a fixed-length embedding.
///
/// Implementations must be deterministic for a given model version; the
/// gallery is only meaningful if it was enrolled with the same version.
pub trait EmbeddingExtractor {
    fn extract(&self, frame: &Frame, face: &Rect) -> Result<Embedding, ExtractionError>;
}
