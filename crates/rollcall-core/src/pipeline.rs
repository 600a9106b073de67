//! Scan and enrollment pipeline.
//!
//! Detector → liveness gate → extractor → matcher → ledger guard. The
//! pipeline owns no storage; galleries and ledgers are passed per call so a
//! single pipeline can serve concurrent requests.

use crate::detector::{detect_regions, RegionDetector};
use crate::error::{Precondition, ScanError};
use crate::frame::Frame;
use crate::gallery::{GalleryReader, GalleryWriter};
use crate::ledger::{record_if_absent, LedgerOutcome, LedgerStore};
use crate::liveness::{self, LivenessPolicy};
use crate::matcher::{FirstMatch, Matcher, DEFAULT_TOLERANCE};
use crate::recognizer::EmbeddingExtractor;
use crate::types::{
    confidence_from_distance, AttendanceRecord, Embedding, GalleryEntry, MatchResult, Rect,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tunables for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Maximum Euclidean distance for a match.
    pub tolerance: f32,
    pub liveness: LivenessPolicy,
    /// When false, scans skip the liveness gate. Enrollment always runs it.
    pub require_liveness: bool,
    /// Expected embedding dimension; `None` accepts whatever the extractor returns.
    pub embedding_dim: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            liveness: LivenessPolicy::default(),
            require_liveness: true,
            embedding_dim: None,
        }
    }
}

/// Whether this scan created today's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Recorded,
    AlreadyRecorded,
}

/// A scan that resolved to an enrolled identity.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub identity_id: String,
    pub distance: f32,
    pub confidence: f32,
    pub status: AttendanceStatus,
    pub record: AttendanceRecord,
}

/// Stateless orchestrator over an external detector and extractor.
pub struct Pipeline<'a> {
    detector: &'a dyn RegionDetector,
    extractor: &'a dyn EmbeddingExtractor,
    settings: PipelineSettings,
    matcher: FirstMatch,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        detector: &'a dyn RegionDetector,
        extractor: &'a dyn EmbeddingExtractor,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            detector,
            extractor,
            settings,
            matcher: FirstMatch,
        }
    }

    /// Identify the person in `frame` and record today's attendance for them.
    pub fn scan<G, L>(
        &self,
        frame: &Frame,
        gallery: &G,
        ledger: &L,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, ScanError>
    where
        G: GalleryReader + ?Sized,
        L: LedgerStore + ?Sized,
    {
        let face = self.locate_face(frame, self.settings.require_liveness)?;
        let probe = self.embed(frame, &face)?;

        let entries = gallery.load_gallery()?;
        tracing::debug!(entries = entries.len(), "scan: gallery snapshot loaded");

        let (identity_id, distance) =
            match self.matcher.compare(&probe, &entries, self.settings.tolerance)? {
                MatchResult::Matched { identity_id, distance } => (identity_id, distance),
                MatchResult::NoMatch => {
                    tracing::info!(
                        tolerance = self.settings.tolerance,
                        "scan: face not recognized"
                    );
                    return Err(ScanError::NoMatch);
                }
            };

        let confidence = confidence_from_distance(distance);
        tracing::info!(identity = %identity_id, distance, confidence, "scan: identity matched");

        let outcome = record_if_absent(ledger, &identity_id, now, confidence)?;
        let status = match &outcome {
            LedgerOutcome::Recorded(_) => AttendanceStatus::Recorded,
            LedgerOutcome::AlreadyRecorded(_) => AttendanceStatus::AlreadyRecorded,
        };
        tracing::info!(identity = %identity_id, ?status, "scan: attendance resolved");

        Ok(ScanOutcome {
            identity_id,
            distance,
            confidence,
            status,
            record: outcome.record().clone(),
        })
    }

    /// Enroll the person in `frame` as `identity_id`, replacing any previous
    /// embedding for that identity. Always runs the liveness gate.
    pub fn enroll<W>(
        &self,
        identity_id: &str,
        frame: &Frame,
        gallery: &W,
    ) -> Result<GalleryEntry, ScanError>
    where
        W: GalleryWriter + ?Sized,
    {
        let face = self.locate_face(frame, true)?;
        let embedding = self.embed(frame, &face)?;

        let entry = GalleryEntry {
            identity_id: identity_id.to_string(),
            embedding,
        };
        gallery.upsert(&entry)?;
        tracing::info!(
            identity = identity_id,
            dimension = entry.embedding.dimension(),
            "enroll: embedding stored"
        );

        Ok(entry)
    }

    /// Detect the subject's face, gating on liveness when asked to.
    fn locate_face(&self, frame: &Frame, gate: bool) -> Result<Rect, ScanError> {
        if frame.is_empty() {
            return Err(Precondition::NoImage.into());
        }
        tracing::debug!(width = frame.width, height = frame.height, "frame received");

        if !gate {
            let faces = self.detector.detect_faces(frame)?;
            tracing::debug!(faces = faces.len(), "liveness gate disabled");
            return faces.into_iter().next().ok_or(ScanError::NoFaceDetected);
        }

        let regions = detect_regions(self.detector, frame)?;
        let verdict =
            liveness::evaluate_with(&self.settings.liveness, &regions, frame.width, frame.height);
        if !verdict.passed {
            tracing::info!(reason = %verdict.reason, faces = regions.len(), "liveness gate rejected frame");
            return Err(ScanError::LivenessFailed(verdict.reason));
        }

        regions
            .into_iter()
            .next()
            .map(|r| r.bounds)
            .ok_or(ScanError::NoFaceDetected)
    }

    fn embed(&self, frame: &Frame, face: &Rect) -> Result<Embedding, ScanError> {
        let embedding = self.extractor.extract(frame, face)?;
        if let Some(expected) = self.settings.embedding_dim {
            if embedding.dimension() != expected {
                return Err(Precondition::DimensionMismatch {
                    expected,
                    actual: embedding.dimension(),
                }
                .into());
            }
        }
        Ok(embedding)
    }
}
