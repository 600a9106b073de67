//! Identity resolution against the enrolled gallery.

use crate::types::{Embedding, GalleryEntry, MatchResult};
use thiserror::Error;

/// Maximum Euclidean distance at which two embeddings are the same person.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("no identities enrolled")]
    EmptyGallery,
    #[error("embedding dimension mismatch for {identity_id}: probe has {expected}, gallery entry has {actual}")]
    DimensionMismatch {
        identity_id: String,
        expected: usize,
        actual: usize,
    },
}

/// Strategy for comparing a probe embedding against a gallery of enrolled faces.
pub trait Matcher {
    fn compare(
        &self,
        probe: &Embedding,
        gallery: &[GalleryEntry],
        tolerance: f32,
    ) -> Result<MatchResult, MatchError>;
}

/// First-match-wins Euclidean matcher.
///
/// Returns the first entry, in gallery order, whose distance is within
/// tolerance, even when a later entry is closer. An enrolled lookalike earlier
/// in the gallery can therefore mask a closer true match.
// TODO: arg-min matcher once owners confirm first-match is not load-bearing.
pub struct FirstMatch;

impl Matcher for FirstMatch {
    fn compare(
        &self,
        probe: &Embedding,
        gallery: &[GalleryEntry],
        tolerance: f32,
    ) -> Result<MatchResult, MatchError> {
        if gallery.is_empty() {
            return Err(MatchError::EmptyGallery);
        }

        if let Some(entry) = gallery
            .iter()
            .find(|e| e.embedding.dimension() != probe.dimension())
        {
            return Err(MatchError::DimensionMismatch {
                identity_id: entry.identity_id.clone(),
                expected: probe.dimension(),
                actual: entry.embedding.dimension(),
            });
        }

        // NaN distances never satisfy `<=`, so corrupt vectors cannot match.
        let hit = gallery.iter().find_map(|entry| {
            let distance = probe.euclidean_distance(&entry.embedding);
            (distance <= tolerance).then(|| MatchResult::Matched {
                identity_id: entry.identity_id.clone(),
                distance,
            })
        });

        Ok(hit.unwrap_or(MatchResult::NoMatch))
    }
}

/// Match `probe` against `gallery` with the first-match policy.
pub fn match_identity(
    probe: &Embedding,
    gallery: &[GalleryEntry],
    tolerance: f32,
) -> Result<MatchResult, MatchError> {
    FirstMatch.compare(probe, gallery, tolerance)
}
