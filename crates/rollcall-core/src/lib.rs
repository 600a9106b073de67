//! rollcall-core — Liveness gate, identity matching and the daily attendance
//! ledger guard.
//!
//! Face detection, embedding extraction and storage are external
//! collaborators reached through the traits in [`detector`], [`recognizer`],
//! [`gallery`] and [`ledger`]. The decision functions themselves are pure and
//! never log; [`pipeline`] wires them together.

pub mod detector;
pub mod error;
pub mod frame;
pub mod gallery;
pub mod ledger;
pub mod liveness;
pub mod matcher;
pub mod pipeline;
pub mod recognizer;
pub mod types;

pub use detector::{DetectionError, RegionDetector};
pub use error::{Precondition, ScanError, StoreError};
pub use frame::Frame;
pub use gallery::{GalleryReader, GalleryWriter};
pub use ledger::{record_if_absent, InsertOutcome, LedgerOutcome, LedgerStore};
pub use liveness::{evaluate, LivenessPolicy, LivenessReason, LivenessVerdict};
pub use matcher::{match_identity, FirstMatch, MatchError, Matcher, DEFAULT_TOLERANCE};
pub use pipeline::{AttendanceStatus, Pipeline, PipelineSettings, ScanOutcome};
pub use recognizer::{EmbeddingExtractor, ExtractionError};
pub use types::{AttendanceRecord, Embedding, FaceRegion, GalleryEntry, MatchResult, Rect};
