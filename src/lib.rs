//! Addon Repo - static addon repository updater
//!
//! Maintains a plain-file addon repository: stores the latest archive of
//! each addon under `zips/<addon-id>/`, rebuilds `addons.xml` with its MD5
//! checksum, and writes browsable `index.html` pages.

pub mod config;
pub mod index;
pub mod ingest;
pub mod manifest;
pub mod pipeline;

pub use config::{ConfigError, RepoConfig, RepoLayout};
pub use index::{collect_listings, write_indexes, DirectoryListing, IndexError};
pub use ingest::{ingest_archive, parse_addon_id, IngestError, IngestOutcome};
pub use manifest::{build_manifest, ManifestError, ManifestOutcome};
pub use pipeline::{run, PipelineError, Progress, RunReport};
