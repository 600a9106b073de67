use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in the pixel space of the input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (exclusive), widened so it cannot overflow.
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Bottom edge (exclusive), widened so it cannot overflow.
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }
}

/// A detected face together with the eye regions found inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    #[serde(flatten)]
    pub bounds: Rect,
    #[serde(default)]
    pub eyes: Vec<Rect>,
}

/// Face embedding vector (128-dimensional for the default extractor).
///
/// Embeddings are only comparable when produced by the same extractor
/// version; that is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Lower = more similar. Both embeddings must have the same dimension.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One enrolled identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub identity_id: String,
    pub embedding: Embedding,
}

/// Result of matching a probe embedding against a gallery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MatchResult {
    NoMatch,
    Matched { identity_id: String, distance: f32 },
}

impl MatchResult {
    /// Confidence of a match, `1 - distance` bounded to [0, 1].
    pub fn confidence(&self) -> Option<f32> {
        match self {
            MatchResult::Matched { distance, .. } => Some(confidence_from_distance(*distance)),
            MatchResult::NoMatch => None,
        }
    }
}

/// Map a dissimilarity into a bounded confidence score.
pub fn confidence_from_distance(distance: f32) -> f32 {
    (1.0 - distance).clamp(0.0, 1.0)
}

/// A single day's attendance for one identity. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub identity_id: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
}

impl AttendanceRecord {
    /// UTC calendar day this record belongs to.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Embedding::new(vec![0.25, -0.5, 1.0]);
        assert_eq!(a.euclidean_distance(&a), 0.0);
    }

    #[test]
    fn test_euclidean_distance_3_4_5() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_is_bounded() {
        assert!((confidence_from_distance(0.55) - 0.45).abs() < 1e-6);
        assert_eq!(confidence_from_distance(1.4), 0.0);
        assert_eq!(confidence_from_distance(-0.1), 1.0);
    }

    #[test]
    fn test_no_match_has_no_confidence() {
        assert_eq!(MatchResult::NoMatch.confidence(), None);
    }

    #[test]
    fn test_record_day_is_utc_date() {
        let record = AttendanceRecord {
            identity_id: "E1".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap(),
            confidence: 0.9,
        };
        assert_eq!(record.day(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_face_region_deserializes_flat() {
        let region: FaceRegion = serde_json::from_str(
            r#"{"x": 10, "y": 20, "width": 150, "height": 160,
                "eyes": [{"x": 40, "y": 60, "width": 20, "height": 12}]}"#,
        )
        .unwrap();
        assert_eq!(region.bounds, Rect::new(10, 20, 150, 160));
        assert_eq!(region.eyes.len(), 1);
    }

    #[test]
    fn test_face_region_eyes_default_empty() {
        let region: FaceRegion =
            serde_json::from_str(r#"{"x": 0, "y": 0, "width": 1, "height": 1}"#).unwrap();
        assert!(region.eyes.is_empty());
    }
}
