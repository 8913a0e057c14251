//! Repository manifest (addons.xml) and its checksum (addons.xml.md5)
//!
//! The manifest is rebuilt from scratch on every run: one descriptor per
//! addon directory, taken from the lexicographically-last archive in that
//! directory. File names therefore have to sort in version order.

mod descriptor;

pub use descriptor::{is_descriptor_entry, read_descriptor, strip_declaration, DESCRIPTOR_NAME};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::RepoLayout;
use crate::ingest::archive_names;

/// Opening of the manifest document, up to and including the root element
pub const MANIFEST_HEADER: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<addons>\n";

/// Closing root element of the manifest document
pub const MANIFEST_FOOTER: &str = "</addons>\n";

/// Errors for manifest operations
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Storage directory not found: {0}")]
    StorageMissing(PathBuf),

    #[error("Cannot read archive {path}: {source}")]
    ArchiveError {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Descriptor {entry} in {archive} is not valid UTF-8")]
    InvalidUtf8 { archive: PathBuf, entry: String },
}

/// One addon's contribution to the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonDescriptor {
    /// Addon directory name under the storage tree
    pub addon: String,

    /// Archive file the descriptor was read from
    pub archive: String,

    /// Descriptor text with the XML declaration removed
    pub xml: String,
}

/// Addon listed in a written manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedAddon {
    pub addon: String,
    pub archive: String,
}

/// Result of writing the manifest and checksum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestOutcome {
    /// Addons included, in manifest order
    pub addons: Vec<IncludedAddon>,

    /// Path of the manifest file
    pub manifest_path: PathBuf,

    /// Path of the checksum file
    pub checksum_path: PathBuf,

    /// Lowercase hex MD5 of the manifest bytes
    pub md5: String,

    /// Manifest size in bytes
    pub size: u64,
}

/// Addon directories in the storage tree, sorted by name
///
/// Entries starting with `.` or `_` and anything that is not a directory
/// are skipped.
pub fn addon_dirs(storage: &Path) -> Result<Vec<(String, PathBuf)>, ManifestError> {
    if !storage.is_dir() {
        return Err(ManifestError::StorageMissing(storage.to_path_buf()));
    }

    let mut dirs = Vec::new();
    for entry in fs::read_dir(storage)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        if !entry.path().is_dir() {
            continue;
        }
        dirs.push((name, entry.path()));
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

/// Lexicographically-last archive name in an addon directory
pub fn latest_archive(addon_dir: &Path) -> io::Result<Option<OsString>> {
    Ok(archive_names(addon_dir)?.pop())
}

/// Read one descriptor per addon directory, in directory name order
///
/// Directories without archives, and archives whose descriptor is missing
/// or empty, are left out.
pub fn collect_descriptors(layout: &RepoLayout) -> Result<Vec<AddonDescriptor>, ManifestError> {
    let mut descriptors = Vec::new();

    for (addon, dir) in addon_dirs(&layout.storage_path())? {
        let Some(archive) = latest_archive(&dir)? else {
            tracing::debug!(addon = %addon, "no archive, skipping");
            continue;
        };

        let path = dir.join(&archive);
        let archive = archive.to_string_lossy().to_string();

        match read_descriptor(&path)? {
            Some(text) if !text.is_empty() => descriptors.push(AddonDescriptor {
                addon,
                archive,
                xml: strip_declaration(&text),
            }),
            _ => {
                tracing::debug!(addon = %addon, archive = %archive, "no usable {} in archive, skipping", DESCRIPTOR_NAME);
            }
        }
    }

    Ok(descriptors)
}

/// Render the manifest document
pub fn render_manifest(descriptors: &[AddonDescriptor]) -> String {
    let mut content = String::from(MANIFEST_HEADER);
    for descriptor in descriptors {
        content.push_str(&descriptor.xml);
        content.push('\n');
    }
    content.push_str(MANIFEST_FOOTER);
    content
}

/// Lowercase hex MD5 of bytes
pub fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Rebuild the manifest and checksum files
pub fn build_manifest(layout: &RepoLayout) -> Result<ManifestOutcome, ManifestError> {
    let descriptors = collect_descriptors(layout)?;
    let content = render_manifest(&descriptors);
    let md5 = md5_hex(content.as_bytes());

    let manifest_path = layout.manifest_path();
    let checksum_path = layout.checksum_path();
    fs::write(&manifest_path, content.as_bytes())?;
    fs::write(&checksum_path, &md5)?;

    tracing::info!(
        path = %manifest_path.display(),
        addons = descriptors.len(),
        md5 = %md5,
        "manifest written"
    );

    Ok(ManifestOutcome {
        addons: descriptors
            .into_iter()
            .map(|d| IncludedAddon {
                addon: d.addon,
                archive: d.archive,
            })
            .collect(),
        manifest_path,
        checksum_path,
        md5,
        size: content.len() as u64,
    })
}

/// Whether the checksum file matches the manifest file currently on disk
pub fn verify_checksum(layout: &RepoLayout) -> io::Result<bool> {
    let manifest = fs::read(layout.manifest_path())?;
    let recorded = fs::read_to_string(layout.checksum_path())?;
    Ok(recorded.trim() == md5_hex(&manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn descriptor(addon: &str, xml: &str) -> AddonDescriptor {
        AddonDescriptor {
            addon: addon.to_string(),
            archive: format!("{}-1.0.zip", addon),
            xml: xml.to_string(),
        }
    }

    #[test]
    fn test_render_empty_manifest() {
        assert_eq!(
            render_manifest(&[]),
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<addons>\n</addons>\n"
        );
    }

    #[test]
    fn test_render_keeps_order() {
        let content = render_manifest(&[
            descriptor("b", "<addon id=\"b\"/>"),
            descriptor("a", "<addon id=\"a\"/>"),
        ]);
        assert!(content.ends_with("<addons>\n<addon id=\"b\"/>\n<addon id=\"a\"/>\n</addons>\n"));
    }

    #[test]
    fn test_md5_hex_known_value() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_addon_dirs_skips_hidden_and_files() {
        let dir = TempDir::new().unwrap();
        for name in ["b.addon", "a.addon", ".git", "_drafts"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("index.html"), "").unwrap();

        let names: Vec<_> = addon_dirs(dir.path())
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["a.addon", "b.addon"]);
    }

    #[test]
    fn test_addon_dirs_missing_storage() {
        let dir = TempDir::new().unwrap();
        let result = addon_dirs(&dir.path().join("zips"));
        assert!(matches!(result, Err(ManifestError::StorageMissing(_))));
    }

    #[test]
    fn test_latest_archive_is_lexicographic_last() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a-1.10.0.zip"), "").unwrap();
        fs::write(dir.path().join("a-1.9.0.zip"), "").unwrap();
        fs::write(dir.path().join("index.html"), "").unwrap();

        // Filename ordering, not version ordering
        assert_eq!(
            latest_archive(dir.path()).unwrap(),
            Some(OsString::from("a-1.9.0.zip"))
        );
    }

    #[test]
    fn test_latest_archive_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(latest_archive(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_empty_descriptor_is_skipped() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let dir = TempDir::new().unwrap();
        let layout = RepoLayout::new(dir.path());
        let addon_dir = layout.addon_dir("p.a");
        fs::create_dir_all(&addon_dir).unwrap();

        let file = fs::File::create(addon_dir.join("p.a-1.0.zip")).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer.start_file("p.a/addon.xml", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"").unwrap();
        writer.finish().unwrap();

        let outcome = build_manifest(&layout).unwrap();

        assert!(outcome.addons.is_empty());
        assert_eq!(
            fs::read_to_string(layout.manifest_path()).unwrap(),
            format!("{}{}", MANIFEST_HEADER, MANIFEST_FOOTER)
        );
    }

    #[test]
    fn test_build_manifest_empty_storage() {
        let dir = TempDir::new().unwrap();
        let layout = RepoLayout::new(dir.path());
        fs::create_dir(layout.storage_path()).unwrap();

        let outcome = build_manifest(&layout).unwrap();
        assert!(outcome.addons.is_empty());
        assert!(verify_checksum(&layout).unwrap());
    }

    #[test]
    fn test_verify_checksum_detects_stale_manifest() {
        let dir = TempDir::new().unwrap();
        let layout = RepoLayout::new(dir.path());
        fs::create_dir(layout.storage_path()).unwrap();
        build_manifest(&layout).unwrap();

        fs::write(layout.manifest_path(), "<addons/>").unwrap();
        assert!(!verify_checksum(&layout).unwrap());
    }
}
