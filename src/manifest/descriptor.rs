//! Descriptor extraction from addon archives

use regex_lite::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use super::ManifestError;

/// File name of the descriptor inside an archive
pub const DESCRIPTOR_NAME: &str = "addon.xml";

/// Whether a zip entry path is `<dir>/addon.xml`, one directory level deep
pub fn is_descriptor_entry(name: &str) -> bool {
    matches!(name.split_once('/'), Some((_, rest)) if rest == DESCRIPTOR_NAME)
}

/// Read the descriptor text from an archive
///
/// Returns `Ok(None)` when the archive has no `<dir>/addon.xml` entry. The
/// first matching entry in archive order wins.
pub fn read_descriptor(archive_path: &Path) -> Result<Option<String>, ManifestError> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| ManifestError::ArchiveError {
        path: archive_path.to_path_buf(),
        source,
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| ManifestError::ArchiveError {
            path: archive_path.to_path_buf(),
            source,
        })?;
        if !is_descriptor_entry(entry.name()) {
            continue;
        }

        let entry_name = entry.name().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;

        let text = String::from_utf8(bytes).map_err(|_| ManifestError::InvalidUtf8 {
            archive: archive_path.to_path_buf(),
            entry: entry_name,
        })?;
        return Ok(Some(text));
    }

    Ok(None)
}

fn declaration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<\?xml[^?]*\?>\s*").expect("declaration pattern is valid"))
}

/// Remove XML declarations and surrounding whitespace from a descriptor
///
/// A leading byte-order mark is dropped as well, since the fragment ends up
/// in the middle of the manifest.
///
/// `\s` in the pattern is ASCII-only; non-ASCII whitespace between a
/// declaration and the element is removed by the final `trim`.
pub fn strip_declaration(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    declaration_pattern().replace_all(text, "").trim().to_string()
}
