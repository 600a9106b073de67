//! Face and eye region detection.
//!
//! The detector itself lives outside this crate (a cascade classifier, a
//! CNN, or a replay of results computed elsewhere); this module defines the
//! seam the pipeline calls through.

use crate::frame::Frame;
use crate::types::{FaceRegion, Rect};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("detector unavailable: {0}")]
    Unavailable(String),
    #[error("detection failed: {0}")]
    Failed(String),
}

/// Finds faces, and eyes within a face, in a frame.
pub trait RegionDetector {
    /// Face boxes in the frame's pixel space.
    fn detect_faces(&self, frame: &Frame) -> Result<Vec<Rect>, DetectionError>;

    /// Eye boxes inside `face`, in the frame's pixel space.
    fn detect_eyes(&self, frame: &Frame, face: &Rect) -> Result<Vec<Rect>, DetectionError>;
}

/// Run face detection, then eye detection for every face found.
pub fn detect_regions<D: RegionDetector + ?Sized>(
    detector: &D,
    frame: &Frame,
) -> Result<Vec<FaceRegion>, DetectionError> {
    detector
        .detect_faces(frame)?
        .into_iter()
        .map(|bounds| {
            let eyes = detector.detect_eyes(frame, &bounds)?;
            Ok(FaceRegion { bounds, eyes })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TwoFaces;

    impl RegionDetector for TwoFaces {
        fn detect_faces(&self, _frame: &Frame) -> Result<Vec<Rect>, DetectionError> {
            Ok(vec![Rect::new(0, 0, 10, 10), Rect::new(50, 50, 10, 10)])
        }

        fn detect_eyes(&self, _frame: &Frame, face: &Rect) -> Result<Vec<Rect>, DetectionError> {
            // Only the face at the origin has eyes.
            if face.x == 0 {
                Ok(vec![Rect::new(2, 2, 2, 2)])
            } else {
                Ok(vec![])
            }
        }
    }

    struct Broken;

    impl RegionDetector for Broken {
        fn detect_faces(&self, _frame: &Frame) -> Result<Vec<Rect>, DetectionError> {
            Ok(vec![Rect::new(0, 0, 10, 10)])
        }

        fn detect_eyes(&self, _frame: &Frame, _face: &Rect) -> Result<Vec<Rect>, DetectionError> {
            Err(DetectionError::Failed("cascade not loaded".into()))
        }
    }

    #[test]
    fn test_detect_regions_nests_eyes_per_face() {
        let frame = Frame::new(vec![0; 100 * 100], 100, 100);
        let regions = detect_regions(&TwoFaces, &frame).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].eyes.len(), 1);
        assert!(regions[1].eyes.is_empty());
    }

    #[test]
    fn test_detect_regions_propagates_eye_failure() {
        let frame = Frame::new(vec![0; 100 * 100], 100, 100);
        assert!(matches!(
            detect_regions(&Broken, &frame),
            Err(DetectionError::Failed(_))
        ));
    }
}
