//! Built-in layout defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Config file looked up at the repository root when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "addon-repo.toml";

/// Built-in default names for the repository layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Storage tree directory, relative to the repository root (default: "zips")
    pub storage_dir: String,

    /// Manifest file name (default: "addons.xml")
    pub manifest_file: String,

    /// Checksum file name (default: "addons.xml.md5")
    pub checksum_file: String,

    /// Listing page name (default: "index.html")
    pub index_file: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            storage_dir: "zips".to_string(),
            manifest_file: "addons.xml".to_string(),
            checksum_file: "addons.xml.md5".to_string(),
            index_file: "index.html".to_string(),
        }
    }
}
