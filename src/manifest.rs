//! Run manifest: decides whether a run has anything new to do.
//!
//! The manifest sits next to the outputs. It records a SHA-256 fingerprint of
//! the input tables and the effective configuration; when neither changed and
//! every output file is still in place the pipeline is not re-run.

use crate::config::Config;
use crate::errors::OutputError;
use crate::raslog::OUTPUT_TABLES;
use crate::tables::{self, OutputFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANIFEST_FILE: &str = "raslog_manifest.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRows {
    pub errdump_aggregated: usize,
    pub raslog_counter: usize,
    pub raslog_report: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
    pub rows: ManifestRows,
}

impl RunManifest {
    pub fn new(fingerprint: String, rows: ManifestRows) -> Self {
        Self {
            fingerprint,
            generated_at: Utc::now(),
            rows,
        }
    }
}

/// Hash the raw input tables (in table name order), the configuration and the output format.
pub fn fingerprint(
    inputs: &[(String, Vec<u8>)],
    config: &Config,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    let mut sorted: Vec<&(String, Vec<u8>)> = inputs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (name, bytes) in sorted {
        hasher.update(name.as_bytes());
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hasher.update(serde_json::to_vec(config)?);
    hasher.update(format!("{format:?}").as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Run unless the previous fingerprint is identical and its outputs are all present.
pub fn should_run(
    previous: Option<&RunManifest>,
    current_fingerprint: &str,
    outputs_present: bool,
    force: bool,
) -> bool {
    force || !outputs_present || previous.is_none_or(|p| p.fingerprint != current_fingerprint)
}

/// Whether every output file `format` produces exists in `output_dir`.
pub async fn outputs_present(output_dir: &Path, format: OutputFormat) -> bool {
    for name in OUTPUT_TABLES {
        for path in tables::output_paths(output_dir, name, format) {
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!(path = %path.display(), "output missing");
                return false;
            }
        }
    }
    true
}

pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILE)
}

/// Previous manifest, if present and readable. A corrupt manifest counts as absent.
pub async fn read_manifest(output_dir: &Path) -> Option<RunManifest> {
    let path = manifest_path(output_dir);
    let bytes = tokio::fs::read(&path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring unreadable manifest");
            None
        }
    }
}

pub async fn write_manifest(output_dir: &Path, manifest: &RunManifest) -> Result<(), OutputError> {
    let path = manifest_path(output_dir);
    let bytes = serde_json::to_vec_pretty(manifest)?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| OutputError::Write { path, source })
}
