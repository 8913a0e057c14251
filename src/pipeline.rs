//! Update pipeline
//!
//! One run of the updater:
//! - Ingest the given archive (optional)
//! - Rebuild addons.xml and addons.xml.md5
//! - Rewrite the index.html pages
//!
//! Stages run in order and the first error aborts the run.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, RepoLayout};
use crate::index::{write_indexes, IndexError, IndexOutcome};
use crate::ingest::{ingest_archive, IngestError, IngestOutcome};
use crate::manifest::{build_manifest, ManifestError, ManifestOutcome};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Ingest(IngestError::UnparsableName { .. })
            | PipelineError::Ingest(IngestError::SourceMissing(_))
            | PipelineError::Ingest(IngestError::InvalidPath(_)) => 1,
            PipelineError::Config(_) => 2,
            PipelineError::Ingest(IngestError::IoError(_)) => 3,
            PipelineError::Manifest(_) => 3,
            PipelineError::Index(_) => 3,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Where progress lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Progress {
    /// Print progress lines to stderr
    #[default]
    Stderr,
    /// Print nothing
    Quiet,
}

impl Progress {
    fn line(&self, msg: impl AsRef<str>) {
        if *self == Progress::Stderr {
            eprintln!("{}", msg.as_ref());
        }
    }
}

/// Everything one run did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// When the run finished
    pub generated_at: DateTime<Utc>,

    /// Ingest result, when an archive was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestOutcome>,

    pub manifest: ManifestOutcome,

    pub index: IndexOutcome,
}

/// Run the updater against a repository
pub fn run(layout: &RepoLayout, archive: Option<&Path>, progress: Progress) -> PipelineResult<RunReport> {
    let ingest = match archive {
        Some(path) => {
            progress.line(format!("Adding: {}", path.display()));
            let outcome = ingest_archive(layout, path)?;
            for old in &outcome.removed {
                progress.line(format!("  - removed {}", old));
            }
            progress.line(format!("  + added {}", outcome.archive_name));
            Some(outcome)
        }
        None => None,
    };

    progress.line(format!("Generating {}...", layout.manifest_file_name()));
    let manifest = build_manifest(layout)?;
    for included in &manifest.addons {
        progress.line(format!("  + {}/{}", included.addon, included.archive));
    }
    progress.line(format!(
        "  {} OK ({} addons)",
        layout.manifest_file_name(),
        manifest.addons.len()
    ));
    progress.line(format!("  MD5: {}", manifest.md5));

    let index = write_indexes(layout)?;
    progress.line(format!("  {} OK", layout.index_file_name()));

    Ok(RunReport {
        generated_at: Utc::now(),
        ingest,
        manifest,
        index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_exit_codes() {
        let parse = PipelineError::Ingest(IngestError::UnparsableName {
            file_name: "x.zip".to_string(),
        });
        assert_eq!(parse.exit_code(), 1);

        let config = PipelineError::Config(ConfigError::ValidationError("bad".to_string()));
        assert_eq!(config.exit_code(), 2);

        let io = PipelineError::Manifest(ManifestError::StorageMissing("zips".into()));
        assert_eq!(io.exit_code(), 3);
    }

    #[test]
    fn test_run_without_archive_on_empty_storage() {
        let dir = TempDir::new().unwrap();
        let layout = RepoLayout::new(dir.path());
        fs::create_dir(layout.storage_path()).unwrap();

        let report = run(&layout, None, Progress::Quiet).unwrap();

        assert!(report.ingest.is_none());
        assert!(report.manifest.addons.is_empty());
        assert_eq!(report.index.pages, vec![layout.storage_path().join("index.html")]);
        assert!(layout.root_index_path().exists());
    }

    #[test]
    fn test_run_with_bad_name_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let layout = RepoLayout::new(dir.path());
        fs::create_dir(layout.storage_path()).unwrap();
        let src = dir.path().join("garbage.zip");
        fs::write(&src, "").unwrap();

        let err = run(&layout, Some(&src), Progress::Quiet).unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert!(!layout.manifest_path().exists());
    }

    #[test]
    fn test_report_serializes_without_ingest() {
        let dir = TempDir::new().unwrap();
        let layout = RepoLayout::new(dir.path());
        fs::create_dir(layout.storage_path()).unwrap();

        let report = run(&layout, None, Progress::Quiet).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert!(json.get("ingest").is_none());
        assert_eq!(json["manifest"]["md5"], report.manifest.md5.as_str());
    }
}
