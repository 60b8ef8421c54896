// Resource fetch capability.
//
// The core never opens files itself: it asks a `ResourceSource` for the raw
// text behind a path. The host decides where that text comes from.
use crate::error::{PdiError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

pub trait ResourceSource: Sync {
    /// Return the full text of the resource, or a fetch error.
    fn fetch(&self, path: &str) -> Result<String>;
}

/// Reads resources from files under a root directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceSource for DirSource {
    fn fetch(&self, path: &str) -> Result<String> {
        std::fs::read_to_string(self.root.join(path)).map_err(|e| PdiError::Fetch {
            path: path.to_string(),
            source: e,
        })
    }
}

/// Serves resources from memory. Unknown paths answer with status 404.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, text: &str) -> Self {
        self.files.insert(path.to_string(), text.to_string());
        self
    }
}

impl ResourceSource for MemorySource {
    fn fetch(&self, path: &str) -> Result<String> {
        self.files.get(path).cloned().ok_or_else(|| PdiError::Status {
            path: path.to_string(),
            status: 404,
        })
    }
}
