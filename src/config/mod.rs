//! Repository configuration
//!
//! Resolves the repository layout in three layers:
//! 1. Built-in defaults (`zips/`, `addons.xml`, `addons.xml.md5`, `index.html`)
//! 2. Repo config file (`addon-repo.toml` at the repository root, or `--config`)
//! 3. CLI flags (repository root)
//!
//! Every operation takes a [`RepoLayout`] explicitly; nothing reads
//! process-wide path state.

mod defaults;
mod layout;

pub use defaults::{BuiltinDefaults, DEFAULT_CONFIG_FILE};
pub use layout::{ConfigError, RepoConfig, RepoLayout};
