use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{Frame, GalleryReader, GalleryWriter, Pipeline, ScanError};
use rollcall_store::SqliteStore;
use std::path::{Path, PathBuf};

mod capture;
mod config;

use capture::{load_frame, DetectionReplay};
use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-verified daily attendance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll (or re-enroll) an identity from a captured image
    Enroll {
        /// Identity to enroll, e.g. an employee ID
        #[arg(short, long)]
        identity: String,
        /// Captured image
        #[arg(long)]
        image: PathBuf,
        /// Detector/extractor output for the image (JSON)
        #[arg(long)]
        detections: PathBuf,
    },
    /// Identify the person in an image and record today's attendance
    Scan {
        /// Captured image
        #[arg(long)]
        image: PathBuf,
        /// Detector/extractor output for the image (JSON)
        #[arg(long)]
        detections: PathBuf,
    },
    /// Remove an enrolled identity
    Remove {
        /// Identity to remove
        identity: String,
    },
    /// List enrolled identities
    List,
    /// Show attendance records for an identity, newest first
    History {
        /// Identity to look up
        identity: String,
    },
    /// Show configuration and store status
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::debug!(?config, "configuration loaded");

    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("opening store {}", config.db_path.display()))?;

    match cli.command {
        Commands::Enroll {
            identity,
            image,
            detections,
        } => {
            let (frame, replay) =
                load_inputs(&image, &detections).unwrap_or_else(|err| fail(&err));
            let pipeline = Pipeline::new(&replay, &replay, config.pipeline_settings());

            match pipeline.enroll(&identity, &frame, &store) {
                Ok(entry) => print_json(&serde_json::json!({
                    "success": true,
                    "identity_id": entry.identity_id,
                    "dimension": entry.embedding.dimension(),
                })),
                Err(err) => fail(&err),
            }
        }
        Commands::Scan { image, detections } => {
            let (frame, replay) =
                load_inputs(&image, &detections).unwrap_or_else(|err| fail(&err));
            let pipeline = Pipeline::new(&replay, &replay, config.pipeline_settings());

            match pipeline.scan(&frame, &store, &store, chrono::Utc::now()) {
                Ok(outcome) => print_json(&serde_json::json!({
                    "success": true,
                    "outcome": outcome,
                })),
                Err(err) => fail(&err),
            }
        }
        Commands::Remove { identity } => {
            let removed = store.remove(&identity)?;
            if !removed {
                tracing::warn!(identity = %identity, "identity was not enrolled");
            }
            print_json(&serde_json::json!({ "identity_id": identity, "removed": removed }))
        }
        Commands::List => {
            let identities: Vec<String> = store
                .load_gallery()?
                .into_iter()
                .map(|e| e.identity_id)
                .collect();
            print_json(&serde_json::json!({ "identities": identities }))
        }
        Commands::History { identity } => {
            let records = store.history(&identity)?;
            print_json(&serde_json::json!({
                "identity_id": identity,
                "attendance_records": records,
            }))
        }
        Commands::Status => print_json(&serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "db_path": config.db_path,
            "enrolled": store.enrolled_count()?,
            "config": config,
        })),
    }
}

fn load_inputs(image: &Path, detections: &Path) -> Result<(Frame, DetectionReplay), ScanError> {
    let frame = load_frame(image)?;
    let replay = DetectionReplay::load(detections)?;
    Ok((frame, replay))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a pipeline failure as JSON and exit non-zero.
fn fail(err: &ScanError) -> ! {
    tracing::warn!(kind = err.kind(), error = %err, "request rejected");
    println!("{}", error_document(err));
    std::process::exit(1);
}

fn error_document(err: &ScanError) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "error": err.kind(),
        "message": err.to_string(),
    })
}
