//! Registry configuration.
//!
//! The only thing the registry needs to know about its host is where the
//! monitoring state directory lives. Configuration can be built in code or
//! loaded from a JSON file:
//!
//! ```json
//! {
//!     "state_dir": "/var/lib/monitor/state",
//!     "descriptor_file": "ts_key"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default descriptor file name inside the state directory.
pub const DEFAULT_DESCRIPTOR_FILE: &str = "ts_key";

/// Where the registry finds its descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Monitoring state directory.
    pub state_dir: PathBuf,

    /// Descriptor file name, relative to `state_dir`.
    #[serde(default = "default_descriptor_file")]
    pub descriptor_file: String,
}

fn default_descriptor_file() -> String {
    DEFAULT_DESCRIPTOR_FILE.to_string()
}

impl RegistryConfig {
    /// Creates a configuration using the default descriptor file name.
    pub fn new<P: Into<PathBuf>>(state_dir: P) -> Self {
        Self {
            state_dir: state_dir.into(),
            descriptor_file: default_descriptor_file(),
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, does not parse,
    /// or names an unusable descriptor file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that the descriptor file name is a plain file name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDescriptorName`] if the name is empty
    /// or contains a path separator.
    pub fn validate(&self) -> Result<()> {
        let name = &self.descriptor_file;
        if name.is_empty() {
            return Err(ConfigError::InvalidDescriptorName {
                name: name.clone(),
                reason: "name cannot be empty".to_string(),
            }
            .into());
        }

        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConfigError::InvalidDescriptorName {
                name: name.clone(),
                reason: "name must not contain path components".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Full path of the descriptor file.
    pub fn descriptor_path(&self) -> PathBuf {
        self.state_dir.join(&self.descriptor_file)
    }
}
