//! Archive ingest
//!
//! Places a new addon archive under `<storage>/<addon-id>/`, deleting any
//! archive already stored for that addon so at most one remains.
//!
//! The addon id comes from the archive file name: the shortest prefix that
//! is followed by `-` and a digit (`plugin.video.x-2.3.0.zip` gives
//! `plugin.video.x`). This is a naming convention rather than a version
//! parser. An id that itself contains `-<digit>` is cut at that point, so
//! `skin.foo-2way-1.0.zip` is stored as `skin.foo`.

use filetime::FileTime;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::RepoLayout;

/// File extension that marks an archive inside an addon directory
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Errors for ingest operations
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Cannot parse addon id from: {file_name}")]
    UnparsableName { file_name: String },

    #[error("Archive not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Archive path has no usable file name: {0}")]
    InvalidPath(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// What an ingest did to the storage tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// Addon id parsed from the archive name
    pub addon_id: String,

    /// Archive file name as stored
    pub archive_name: String,

    /// Full path of the stored archive
    pub destination: PathBuf,

    /// Previously stored archives that were deleted (sorted)
    pub removed: Vec<String>,

    /// Bytes copied (0 when the archive was already in place)
    pub bytes_copied: u64,
}

fn addon_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+?)-\d+").expect("addon id pattern is valid"))
}

/// Parse the addon id from an archive file name
pub fn parse_addon_id(file_name: &str) -> Result<String, IngestError> {
    addon_id_pattern()
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| IngestError::UnparsableName {
            file_name: file_name.to_string(),
        })
}

/// Whether a file name looks like an archive
pub fn is_archive_name(name: &str) -> bool {
    is_archive_os_name(OsStr::new(name))
}

/// Extension check on raw name bytes, so non-UTF-8 names still count
fn is_archive_os_name(name: &OsStr) -> bool {
    name.as_encoded_bytes().ends_with(ARCHIVE_EXTENSION.as_bytes())
}

/// Archive file names directly inside `dir`, sorted by raw bytes
///
/// Anything that is not a directory counts, symlinks included, so ingest
/// can delete every stale archive.
pub fn archive_names(dir: &Path) -> io::Result<Vec<OsString>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        if is_archive_os_name(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Archive file names directly inside `dir`, sorted, lossily decoded
pub fn list_archives(dir: &Path) -> io::Result<Vec<String>> {
    Ok(archive_names(dir)?
        .into_iter()
        .map(|name| name.to_string_lossy().to_string())
        .collect())
}

/// Ingest an archive into the storage tree
///
/// Nothing in the repository is touched unless the file name parses and the
/// source exists.
pub fn ingest_archive(layout: &RepoLayout, archive: &Path) -> Result<IngestOutcome, IngestError> {
    let file_name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IngestError::InvalidPath(archive.to_path_buf()))?;

    let addon_id = parse_addon_id(file_name)?;

    if !archive.is_file() {
        return Err(IngestError::SourceMissing(archive.to_path_buf()));
    }

    let addon_dir = layout.addon_dir(&addon_id);
    fs::create_dir_all(&addon_dir)?;

    let destination = addon_dir.join(file_name);
    let in_place = is_same_file(archive, &destination)?;

    let mut removed = Vec::new();
    for old in archive_names(&addon_dir)? {
        if in_place && old.as_os_str() == OsStr::new(file_name) {
            continue;
        }
        fs::remove_file(addon_dir.join(&old))?;
        let old = old.to_string_lossy().to_string();
        tracing::debug!(addon = %addon_id, archive = %old, "removed previous archive");
        removed.push(old);
    }

    let bytes_copied = if in_place {
        0
    } else {
        copy_preserving_times(archive, &destination)?
    };

    tracing::info!(addon = %addon_id, path = %destination.display(), "archive stored");

    Ok(IngestOutcome {
        addon_id,
        archive_name: file_name.to_string(),
        destination,
        removed,
        bytes_copied,
    })
}

/// Copy contents and permissions, then carry over access/modification times
fn copy_preserving_times(src: &Path, dest: &Path) -> io::Result<u64> {
    let bytes = fs::copy(src, dest)?;
    let metadata = fs::metadata(src)?;
    filetime::set_file_times(
        dest,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )?;
    Ok(bytes)
}

fn is_same_file(a: &Path, b: &Path) -> io::Result<bool> {
    if !b.exists() {
        return Ok(false);
    }
    Ok(a.canonicalize()? == b.canonicalize()?)
}
