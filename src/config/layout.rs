//! Repository layout resolved from defaults, config file, and CLI root

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::defaults::{BuiltinDefaults, DEFAULT_CONFIG_FILE};

/// Errors for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("TOML parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repo config file (`addon-repo.toml`)
///
/// Every key is optional; missing keys fall back to [`BuiltinDefaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    /// Storage tree directory relative to the repository root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<String>,

    /// Manifest file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_file: Option<String>,

    /// Checksum file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_file: Option<String>,

    /// Listing page name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_file: Option<String>,
}

impl RepoConfig {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&contents)
    }

    /// Parse config from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: RepoConfig = toml::from_str(s)?;
        Ok(config)
    }
}

/// Resolved repository layout passed to every operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    root: PathBuf,
    storage_dir: String,
    manifest_file: String,
    checksum_file: String,
    index_file: String,
}

impl RepoLayout {
    /// Layout with built-in defaults rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            root: root.into(),
            storage_dir: defaults.storage_dir,
            manifest_file: defaults.manifest_file,
            checksum_file: defaults.checksum_file,
            index_file: defaults.index_file,
        }
    }

    /// Apply a repo config on top of the defaults
    pub fn with_config(mut self, config: &RepoConfig) -> Result<Self, ConfigError> {
        if let Some(storage_dir) = &config.storage_dir {
            self.storage_dir = storage_dir.clone();
        }
        if let Some(manifest_file) = &config.manifest_file {
            self.manifest_file = manifest_file.clone();
        }
        if let Some(checksum_file) = &config.checksum_file {
            self.checksum_file = checksum_file.clone();
        }
        if let Some(index_file) = &config.index_file {
            self.index_file = index_file.clone();
        }
        self.validate()?;
        Ok(self)
    }

    /// Resolve the layout for `root`
    ///
    /// An explicit `config_path` must exist. Without one, `addon-repo.toml`
    /// at the root is used when present.
    pub fn load(root: impl Into<PathBuf>, config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let layout = Self::new(root);

        let config = match config_path {
            Some(path) => Some(RepoConfig::from_file(path)?),
            None => {
                let implicit = layout.root.join(DEFAULT_CONFIG_FILE);
                if implicit.is_file() {
                    Some(RepoConfig::from_file(&implicit)?)
                } else {
                    None
                }
            }
        };

        match config {
            Some(config) => layout.with_config(&config),
            None => Ok(layout),
        }
    }

    /// Validate the layout names
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("storage_dir", &self.storage_dir),
            ("manifest_file", &self.manifest_file),
            ("checksum_file", &self.checksum_file),
            ("index_file", &self.index_file),
        ];
        for (key, value) in names {
            if value.is_empty() {
                return Err(ConfigError::ValidationError(format!("'{}' must not be empty", key)));
            }
            if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
                return Err(ConfigError::ValidationError(format!(
                    "'{}' must be a plain name, got '{}'",
                    key, value
                )));
            }
        }
        if self.manifest_file == self.checksum_file {
            return Err(ConfigError::ValidationError(
                "'manifest_file' and 'checksum_file' must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Repository root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Storage tree directory name
    pub fn storage_dir_name(&self) -> &str {
        &self.storage_dir
    }

    /// Manifest file name
    pub fn manifest_file_name(&self) -> &str {
        &self.manifest_file
    }

    /// Checksum file name
    pub fn checksum_file_name(&self) -> &str {
        &self.checksum_file
    }

    /// Listing page name
    pub fn index_file_name(&self) -> &str {
        &self.index_file
    }

    /// Absolute path of the storage tree
    pub fn storage_path(&self) -> PathBuf {
        self.root.join(&self.storage_dir)
    }

    /// Storage directory for one addon id
    pub fn addon_dir(&self, addon_id: &str) -> PathBuf {
        self.storage_path().join(addon_id)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.manifest_file)
    }

    pub fn checksum_path(&self) -> PathBuf {
        self.root.join(&self.checksum_file)
    }

    /// Root listing page
    pub fn root_index_path(&self) -> PathBuf {
        self.root.join(&self.index_file)
    }
}
