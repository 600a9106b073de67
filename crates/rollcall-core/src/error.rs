use crate::detector::DetectionError;
use crate::liveness::LivenessReason;
use crate::matcher::MatchError;
use crate::recognizer::ExtractionError;
use thiserror::Error;

/// Failure reported by a storage collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid stored data: {0}")]
    InvalidData(String),
    #[error("record for {identity_id} on {day} reported as existing but could not be read back")]
    Inconsistent { identity_id: String, day: String },
}

/// Input the pipeline refuses to work with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    #[error("no image provided")]
    NoImage,
    #[error("no identities enrolled")]
    EmptyGallery,
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Outcome kinds of a scan or enrollment that did not succeed.
///
/// Every kind stays distinguishable so callers can map them to precise
/// responses ("liveness failed" is never "not recognized").
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("precondition failed: {0}")]
    PreconditionFailed(#[from] Precondition),
    #[error("liveness check failed: {0}")]
    LivenessFailed(LivenessReason),
    #[error("no face detected")]
    NoFaceDetected,
    #[error("face not recognized")]
    NoMatch,
    #[error("region detector failed: {0}")]
    Detection(#[from] DetectionError),
    #[error("embedding extractor failed: {0}")]
    Extraction(String),
    #[error("{0}")]
    StoreUnavailable(#[from] StoreError),
}

impl ScanError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::PreconditionFailed(_) => "precondition_failed",
            ScanError::LivenessFailed(_) => "liveness_failed",
            ScanError::NoFaceDetected => "no_face_detected",
            ScanError::NoMatch => "no_match",
            ScanError::Detection(_) => "detection_failed",
            ScanError::Extraction(_) => "extraction_failed",
            ScanError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<MatchError> for ScanError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::EmptyGallery => Precondition::EmptyGallery.into(),
            MatchError::DimensionMismatch { expected, actual, .. } => {
                Precondition::DimensionMismatch { expected, actual }.into()
            }
        }
    }
}

impl From<ExtractionError> for ScanError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::NoFaceEncodable => ScanError::NoFaceDetected,
            ExtractionError::Failed(msg) => ScanError::Extraction(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_gallery_maps_to_precondition() {
        let err = ScanError::from(MatchError::EmptyGallery);
        assert!(matches!(
            err,
            ScanError::PreconditionFailed(Precondition::EmptyGallery)
        ));
        assert_eq!(err.kind(), "precondition_failed");
    }

    #[test]
    fn test_unencodable_face_maps_to_no_face() {
        let err = ScanError::from(ExtractionError::NoFaceEncodable);
        assert!(matches!(err, ScanError::NoFaceDetected));
    }

    #[test]
    fn test_liveness_and_no_match_are_distinct() {
        let liveness = ScanError::LivenessFailed(LivenessReason::NoEyes);
        assert_ne!(liveness.kind(), ScanError::NoMatch.kind());
        assert_eq!(
            liveness.to_string(),
            "liveness check failed: no eyes detected in face"
        );
    }
}
