//! Geometric liveness gate.
//!
//! Rejects frames that are unlikely to show a single live subject facing the
//! camera, using only the face and eye boxes the region detector produced.
//! No model, no state, no I/O.
//!
//! # Threat Coverage
//!
//! - **Blocks:** photo collages and multi-subject frames, flat prints where
//!   the eye detector finds nothing, distant or background photos, faces
//!   pushed against the frame edge.
//! - **Does not block:** a well-framed printed photo with visible eyes,
//!   screen replays, masks. This is a cheap gate, not a proof of liveness.

use crate::types::FaceRegion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum face width and height in input pixels.
pub const DEFAULT_MIN_FACE_PX: u32 = 100;
/// Required margin between the face and each image edge, in percent.
pub const DEFAULT_EDGE_MARGIN_PCT: u32 = 10;

/// Why a frame passed or failed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessReason {
    Live,
    NoFace,
    MultipleFaces,
    NoEyes,
    TooSmall,
    OffCenter,
}

impl fmt::Display for LivenessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LivenessReason::Live => "live",
            LivenessReason::NoFace => "no face in frame",
            LivenessReason::MultipleFaces => "more than one face in frame",
            LivenessReason::NoEyes => "no eyes detected in face",
            LivenessReason::TooSmall => "face too small",
            LivenessReason::OffCenter => "face not centered",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LivenessVerdict {
    pub passed: bool,
    pub reason: LivenessReason,
}

impl LivenessVerdict {
    fn pass() -> Self {
        Self { passed: true, reason: LivenessReason::Live }
    }

    fn fail(reason: LivenessReason) -> Self {
        Self { passed: false, reason }
    }
}

/// Thresholds for the size and centering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessPolicy {
    pub min_face_px: u32,
    pub edge_margin_pct: u32,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            min_face_px: DEFAULT_MIN_FACE_PX,
            edge_margin_pct: DEFAULT_EDGE_MARGIN_PCT,
        }
    }
}

/// Evaluate the gate with the default policy.
pub fn evaluate(regions: &[FaceRegion], image_width: u32, image_height: u32) -> LivenessVerdict {
    evaluate_with(&LivenessPolicy::default(), regions, image_width, image_height)
}

/// Evaluate the gate. Rules run in order and the first failure decides the reason:
/// no face, multiple faces, no eyes, too small, off center.
pub fn evaluate_with(
    policy: &LivenessPolicy,
    regions: &[FaceRegion],
    image_width: u32,
    image_height: u32,
) -> LivenessVerdict {
    let face = match regions {
        [] => return LivenessVerdict::fail(LivenessReason::NoFace),
        [face] => face,
        _ => return LivenessVerdict::fail(LivenessReason::MultipleFaces),
    };

    if face.eyes.is_empty() {
        return LivenessVerdict::fail(LivenessReason::NoEyes);
    }

    let bounds = &face.bounds;
    if bounds.width < policy.min_face_px || bounds.height < policy.min_face_px {
        return LivenessVerdict::fail(LivenessReason::TooSmall);
    }

    if !within_band(u64::from(bounds.x), bounds.right(), image_width, policy.edge_margin_pct)
        || !within_band(u64::from(bounds.y), bounds.bottom(), image_height, policy.edge_margin_pct)
    {
        return LivenessVerdict::fail(LivenessReason::OffCenter);
    }

    LivenessVerdict::pass()
}

/// Whether `[start, end]` lies inside the central band of an axis of length `extent`.
///
/// Integer arithmetic: `start < margin% * extent` fails, equality passes.
fn within_band(start: u64, end: u64, extent: u32, margin_pct: u32) -> bool {
    let extent = u64::from(extent);
    let margin = u64::from(margin_pct);
    let low = start * 100 >= margin * extent;
    let high = end * 100 <= (100u64.saturating_sub(margin)) * extent;
    low && high
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rect;

    const W: u32 = 1000;
    const H: u32 = 800;

    fn face(x: u32, y: u32, w: u32, h: u32) -> FaceRegion {
        FaceRegion {
            bounds: Rect::new(x, y, w, h),
            eyes: vec![Rect::new(x + w / 4, y + h / 3, w / 5, h / 8)],
        }
    }

    fn centered() -> FaceRegion {
        face(400, 300, 200, 200)
    }

    #[test]
    fn test_no_regions_is_no_face() {
        let verdict = evaluate(&[], W, H);
        assert!(!verdict.passed);
        assert_eq!(verdict.reason, LivenessReason::NoFace);
    }

    #[test]
    fn test_two_regions_is_multiple_faces() {
        let verdict = evaluate(&[centered(), centered()], W, H);
        assert_eq!(verdict, LivenessVerdict::fail(LivenessReason::MultipleFaces));
    }

    #[test]
    fn test_multiple_faces_wins_over_later_rules() {
        // Both regions would fail every per-face rule; the count rule comes first.
        let bad = FaceRegion { bounds: Rect::new(0, 0, 10, 10), eyes: vec![] };
        let verdict = evaluate(&[bad.clone(), bad.clone(), bad], W, H);
        assert_eq!(verdict.reason, LivenessReason::MultipleFaces);
    }

    #[test]
    fn test_no_eyes() {
        let mut region = centered();
        region.eyes.clear();
        assert_eq!(evaluate(&[region], W, H).reason, LivenessReason::NoEyes);
    }

    #[test]
    fn test_no_eyes_checked_before_size() {
        let region = FaceRegion { bounds: Rect::new(400, 300, 20, 20), eyes: vec![] };
        assert_eq!(evaluate(&[region], W, H).reason, LivenessReason::NoEyes);
    }

    #[test]
    fn test_width_99_too_small() {
        let verdict = evaluate(&[face(400, 300, 99, 200)], W, H);
        assert_eq!(verdict.reason, LivenessReason::TooSmall);
    }

    #[test]
    fn test_height_99_too_small() {
        let verdict = evaluate(&[face(400, 300, 200, 99)], W, H);
        assert_eq!(verdict.reason, LivenessReason::TooSmall);
    }

    #[test]
    fn test_too_small_checked_before_centering() {
        let verdict = evaluate(&[face(0, 0, 99, 99)], W, H);
        assert_eq!(verdict.reason, LivenessReason::TooSmall);
    }

    #[test]
    fn test_100_by_100_passes_size_rule() {
        let verdict = evaluate(&[face(400, 300, 100, 100)], W, H);
        assert!(verdict.passed);
        assert_eq!(verdict.reason, LivenessReason::Live);
    }

    #[test]
    fn test_left_edge_exactly_at_margin_passes() {
        // 10% of 1000 = 100
        assert!(evaluate(&[face(100, 300, 200, 200)], W, H).passed);
    }

    #[test]
    fn test_left_edge_inside_margin_fails() {
        let verdict = evaluate(&[face(99, 300, 200, 200)], W, H);
        assert_eq!(verdict.reason, LivenessReason::OffCenter);
    }

    #[test]
    fn test_right_edge_boundary() {
        // right edge at 900 passes, 901 fails
        assert!(evaluate(&[face(700, 300, 200, 200)], W, H).passed);
        assert_eq!(
            evaluate(&[face(701, 300, 200, 200)], W, H).reason,
            LivenessReason::OffCenter
        );
    }

    #[test]
    fn test_top_edge_boundary() {
        // 10% of 800 = 80
        assert!(evaluate(&[face(400, 80, 200, 200)], W, H).passed);
        assert_eq!(
            evaluate(&[face(400, 79, 200, 200)], W, H).reason,
            LivenessReason::OffCenter
        );
    }

    #[test]
    fn test_bottom_edge_boundary() {
        // 90% of 800 = 720
        assert!(evaluate(&[face(400, 520, 200, 200)], W, H).passed);
        assert_eq!(
            evaluate(&[face(400, 521, 200, 200)], W, H).reason,
            LivenessReason::OffCenter
        );
    }

    #[test]
    fn test_custom_policy() {
        let policy = LivenessPolicy { min_face_px: 50, edge_margin_pct: 0 };
        let verdict = evaluate_with(&policy, &[face(0, 0, 60, 60)], 60, 60);
        assert!(verdict.passed);
    }

    #[test]
    fn test_face_larger_than_band_is_off_center() {
        let verdict = evaluate(&[face(0, 0, W, H)], W, H);
        assert_eq!(verdict.reason, LivenessReason::OffCenter);
    }
}
