//! Image decoding and replay of out-of-process detector output.
//!
//! The face detector and embedding model run outside this binary and write
//! their results as JSON:
//!
//! ```json
//! {
//!   "faces": [{"x": 220, "y": 140, "width": 200, "height": 200,
//!              "eyes": [{"x": 260, "y": 190, "width": 40, "height": 20}]}],
//!   "embedding": [0.01, -0.12, ...]
//! }
//! ```
//!
//! `encoding` is accepted as an alias for `embedding`.

use rollcall_core::{
    DetectionError, Embedding, EmbeddingExtractor, ExtractionError, FaceRegion, Frame,
    Precondition, Rect, RegionDetector, ScanError,
};
use serde::Deserialize;
use std::path::Path;

/// Decode an image file into a grayscale frame.
///
/// A missing, empty or undecodable file is treated as no image at all.
pub fn load_frame(path: &Path) -> Result<Frame, ScanError> {
    let image = image::open(path)
        .map_err(|err| {
            tracing::warn!(path = %path.display(), error = %err, "could not decode image");
            Precondition::NoImage
        })?
        .to_luma8();
    let (width, height) = image.dimensions();
    Ok(Frame::new(image.into_raw(), width, height))
}

/// Detector and extractor results recorded for one image.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionReplay {
    #[serde(default)]
    pub faces: Vec<FaceRegion>,
    #[serde(default, alias = "encoding")]
    pub embedding: Option<Vec<f32>>,
}

impl DetectionReplay {
    /// Read a detections file. An unreadable or malformed file means the
    /// detector's output is unavailable for this image.
    pub fn load(path: &Path) -> Result<Self, DetectionError> {
        let data = std::fs::read(path).map_err(|err| {
            DetectionError::Unavailable(format!("reading {}: {err}", path.display()))
        })?;
        Self::from_slice(&data).map_err(|err| {
            DetectionError::Unavailable(format!("parsing {}: {err}", path.display()))
        })
    }

    pub fn from_slice(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}

impl RegionDetector for DetectionReplay {
    fn detect_faces(&self, frame: &Frame) -> Result<Vec<Rect>, DetectionError> {
        self.faces
            .iter()
            .map(|f| check_in_frame(&f.bounds, frame).map(|()| f.bounds))
            .collect()
    }

    fn detect_eyes(&self, frame: &Frame, face: &Rect) -> Result<Vec<Rect>, DetectionError> {
        check_in_frame(face, frame)?;
        self.faces
            .iter()
            .find(|f| f.bounds == *face)
            .map(|f| f.eyes.clone())
            .ok_or_else(|| DetectionError::Failed(format!("face {face:?} not in replay")))
    }
}

fn check_in_frame(face: &Rect, frame: &Frame) -> Result<(), DetectionError> {
    if face.right() > u64::from(frame.width) || face.bottom() > u64::from(frame.height) {
        return Err(DetectionError::Failed(format!(
            "face {face:?} outside {}x{} frame; detections belong to another image",
            frame.width, frame.height
        )));
    }
    Ok(())
}

impl EmbeddingExtractor for DetectionReplay {
    fn extract(&self, _frame: &Frame, _face: &Rect) -> Result<Embedding, ExtractionError> {
        self.embedding
            .clone()
            .map(Embedding::new)
            .ok_or(ExtractionError::NoFaceEncodable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "faces": [{"x": 220, "y": 140, "width": 200, "height": 200,
                   "eyes": [{"x": 260, "y": 190, "width": 40, "height": 20}]}],
        "embedding": [0.5, -0.25]
    }"#;

    fn frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![0; (w * h) as usize], w, h)
    }

    #[test]
    fn test_replay_parses_faces_and_embedding() {
        let replay = DetectionReplay::from_slice(SAMPLE.as_bytes()).unwrap();
        let faces = replay.detect_faces(&frame(640, 480)).unwrap();
        assert_eq!(faces, vec![Rect::new(220, 140, 200, 200)]);

        let eyes = replay.detect_eyes(&frame(640, 480), &faces[0]).unwrap();
        assert_eq!(eyes.len(), 1);

        let embedding = replay.extract(&frame(640, 480), &faces[0]).unwrap();
        assert_eq!(embedding.values(), &[0.5f32, -0.25]);
    }

    #[test]
    fn test_encoding_alias() {
        let replay =
            DetectionReplay::from_slice(br#"{"success": true, "encoding": [1.0]}"#).unwrap();
        assert!(replay.faces.is_empty());
        assert_eq!(replay.embedding, Some(vec![1.0]));
    }

    #[test]
    fn test_missing_embedding_is_unencodable() {
        let replay = DetectionReplay::from_slice(br#"{"faces": []}"#).unwrap();
        assert!(matches!(
            replay.extract(&frame(10, 10), &Rect::new(0, 0, 1, 1)),
            Err(ExtractionError::NoFaceEncodable)
        ));
    }

    #[test]
    fn test_face_outside_frame_is_rejected() {
        let replay = DetectionReplay::from_slice(SAMPLE.as_bytes()).unwrap();
        let face = Rect::new(220, 140, 200, 200);
        assert!(replay.detect_eyes(&frame(320, 240), &face).is_err());
        assert!(matches!(
            replay.detect_faces(&frame(320, 240)),
            Err(DetectionError::Failed(_))
        ));
    }

    #[test]
    fn test_unreadable_image_is_no_image() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();
        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"not an image at all").unwrap();
        let missing = dir.path().join("missing.png");

        for path in [empty, garbage, missing] {
            let err = load_frame(&path).unwrap_err();
            assert!(matches!(
                err,
                ScanError::PreconditionFailed(Precondition::NoImage)
            ));
            assert_eq!(err.kind(), "precondition_failed");
        }
    }

    #[test]
    fn test_malformed_detections_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.json");
        std::fs::write(&path, b"{\"faces\": [").unwrap();

        assert!(matches!(
            DetectionReplay::load(&path),
            Err(DetectionError::Unavailable(_))
        ));
        assert!(matches!(
            DetectionReplay::load(&dir.path().join("absent.json")),
            Err(DetectionError::Unavailable(_))
        ));
    }

    #[test]
    fn test_load_frame_reads_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.png");
        image::GrayImage::from_pixel(64, 48, image::Luma([200u8]))
            .save(&path)
            .unwrap();

        let frame = load_frame(&path).unwrap();
        assert_eq!((frame.width, frame.height), (64, 48));
        assert_eq!(frame.data.len(), 64 * 48);
    }
}
