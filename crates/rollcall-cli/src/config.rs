use rollcall_core::liveness::{DEFAULT_EDGE_MARGIN_PCT, DEFAULT_MIN_FACE_PX};
use rollcall_core::{LivenessPolicy, PipelineSettings, DEFAULT_TOLERANCE};
use serde::Serialize;
use std::path::PathBuf;

/// Embedding length produced by the reference extractor.
const DEFAULT_EMBEDDING_DIM: usize = 128;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Maximum Euclidean distance for a positive match.
    pub tolerance: f32,
    /// Minimum face width/height in pixels for the liveness gate.
    pub min_face_px: u32,
    /// Edge margin in percent for the liveness gate.
    pub edge_margin_pct: u32,
    /// Whether scans run the liveness gate.
    pub require_liveness: bool,
    /// Expected embedding dimension; 0 disables the check.
    pub embedding_dim: usize,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        let db_path = std::env::var("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("rollcall.db"));

        Self {
            db_path,
            tolerance: env_f32("ROLLCALL_TOLERANCE", DEFAULT_TOLERANCE),
            min_face_px: env_u32("ROLLCALL_MIN_FACE_PX", DEFAULT_MIN_FACE_PX),
            edge_margin_pct: env_u32("ROLLCALL_EDGE_MARGIN_PCT", DEFAULT_EDGE_MARGIN_PCT).min(50),
            require_liveness: env_bool("ROLLCALL_REQUIRE_LIVENESS", true),
            embedding_dim: env_usize("ROLLCALL_EMBEDDING_DIM", DEFAULT_EMBEDDING_DIM),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            tolerance: self.tolerance,
            liveness: LivenessPolicy {
                min_face_px: self.min_face_px,
                edge_margin_pct: self.edge_margin_pct,
            },
            require_liveness: self.require_liveness,
            embedding_dim: (self.embedding_dim > 0).then_some(self.embedding_dim),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v != "0")
        .unwrap_or(default)
}
