//! Browsable listing pages (index.html)
//!
//! Index generation is split in two: [`collect_listings`] walks the storage
//! tree without writing anything, and [`write_indexes`] renders and writes
//! one page per listed directory plus the root page.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::RepoLayout;

const PAGE_HEADER: &str = "<html><body>\n";
const PAGE_FOOTER: &str = "\n</body></html>\n";

/// Errors for index generation
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),
}

/// Kind of a listed child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// One immediate child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl ListingEntry {
    /// Link target and text (directories get a trailing `/`)
    pub fn link_name(&self) -> String {
        match self.kind {
            EntryKind::Directory => format!("{}/", self.name),
            EntryKind::File => self.name.clone(),
        }
    }
}

/// Contents of one directory, directories first, each group sorted by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub path: PathBuf,
    pub entries: Vec<ListingEntry>,
}

/// Pages written by [`write_indexes`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexOutcome {
    /// Listing pages inside the storage tree
    pub pages: Vec<PathBuf>,

    /// Root page
    pub root_page: PathBuf,
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && is_hidden(&entry.file_name().to_string_lossy())
}

/// List the immediate children of one directory
///
/// Hidden subdirectories and files named `index_file` are left out.
pub fn list_directory(dir: &Path, index_file: &str) -> io::Result<DirectoryListing> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_dir() {
            if !is_hidden(&name) {
                dirs.push(name);
            }
        } else if name != index_file {
            files.push(name);
        }
    }
    dirs.sort();
    files.sort();

    let entries = dirs
        .into_iter()
        .map(|name| ListingEntry {
            name,
            kind: EntryKind::Directory,
        })
        .chain(files.into_iter().map(|name| ListingEntry {
            name,
            kind: EntryKind::File,
        }))
        .collect();

    Ok(DirectoryListing {
        path: dir.to_path_buf(),
        entries,
    })
}

/// Walk the storage tree and list every non-hidden directory, root first
pub fn collect_listings(storage: &Path, index_file: &str) -> Result<Vec<DirectoryListing>, IndexError> {
    let mut listings = Vec::new();

    let walker = WalkDir::new(storage)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_dir(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        listings.push(list_directory(entry.path(), index_file)?);
    }

    Ok(listings)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_links<'a>(links: impl IntoIterator<Item = &'a str>) -> String {
    let body: Vec<String> = links
        .into_iter()
        .map(|link| {
            let link = escape_html(link);
            format!("<a href=\"{}\">{}</a>", link, link)
        })
        .collect();
    format!("{}{}{}", PAGE_HEADER, body.join("\n"), PAGE_FOOTER)
}

/// Render a listing page
pub fn render_listing(listing: &DirectoryListing) -> String {
    let names: Vec<String> = listing.entries.iter().map(ListingEntry::link_name).collect();
    render_links(names.iter().map(String::as_str))
}

/// Render the root page linking the storage tree, manifest and checksum
pub fn render_root_index(layout: &RepoLayout) -> String {
    let storage = format!("{}/", layout.storage_dir_name());
    render_links([
        storage.as_str(),
        layout.manifest_file_name(),
        layout.checksum_file_name(),
    ])
}

/// Write a listing page into every storage directory, then the root page
pub fn write_indexes(layout: &RepoLayout) -> Result<IndexOutcome, IndexError> {
    let index_file = layout.index_file_name();
    let listings = collect_listings(&layout.storage_path(), index_file)?;

    let mut pages = Vec::with_capacity(listings.len());
    for listing in &listings {
        let page = listing.path.join(index_file);
        fs::write(&page, render_listing(listing))?;
        tracing::debug!(path = %page.display(), entries = listing.entries.len(), "listing written");
        pages.push(page);
    }

    let root_page = layout.root_index_path();
    fs::write(&root_page, render_root_index(layout))?;
    tracing::info!(pages = pages.len() + 1, "index pages written");

    Ok(IndexOutcome { pages, root_page })
}
