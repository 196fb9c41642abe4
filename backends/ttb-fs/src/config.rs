// this_file: backends/ttb-fs/src/config.rs

//! Filesystem host configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use ttb_core::{BridgeError, Result};

/// Where a filesystem host looks for inputs and puts outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsHostConfig {
    /// Directories searched for inputs, after `output_dir`
    pub search_paths: Vec<PathBuf>,
    /// Directory receiving every output; also searched first for inputs
    pub output_dir: PathBuf,
    /// File served as the primary input; stdin when absent
    pub primary_input: Option<PathBuf>,
    /// Names that are never found, even when present on disk
    pub hidden: Vec<String>,
    /// Echo engine stdout to the process stdout
    pub print_stdout: bool,
    /// Capacity of the file digest cache; 0 disables it
    pub digest_cache_size: usize,
}

impl Default for FsHostConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            output_dir: PathBuf::from("."),
            primary_input: None,
            hidden: Vec::new(),
            print_stdout: false,
            digest_cache_size: 256,
        }
    }
}

impl FsHostConfig {
    /// Parse a JSON document; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BridgeError::config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| BridgeError::config(format!("{}: {e}", path.display())))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BridgeError::config(e.to_string()))
    }

    /// Directories searched for inputs, in order.
    pub fn input_dirs(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.output_dir.as_path()).chain(self.search_paths.iter().map(PathBuf::as_path))
    }
}
