//! Where save files go: the host decides, the engine only sees names and bytes

use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub trait SaveStore {
    /// Store a save blob; false when the host refused or failed
    fn save_blob(&mut self, name: &str, data: &[u8]) -> bool;
    /// Fetch a save blob by name
    fn load_blob(&mut self, name: &str) -> Option<Vec<u8>>;
}

/// Saves kept in memory, for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySaveStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.blobs.keys().map(String::as_str).collect()
    }
}

impl SaveStore for MemorySaveStore {
    fn save_blob(&mut self, name: &str, data: &[u8]) -> bool {
        self.blobs.insert(name.to_string(), data.to_vec());
        true
    }

    fn load_blob(&mut self, name: &str) -> Option<Vec<u8>> {
        self.blobs.get(name).cloned()
    }
}

/// Saves written as `<name>.qzl` files in a directory
#[derive(Debug, Clone)]
pub struct FileSaveStore {
    dir: PathBuf,
}

impl FileSaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSaveStore { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        let stem: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        let stem = if stem.is_empty() { "save".to_string() } else { stem };
        self.dir.join(format!("{stem}.qzl"))
    }
}

impl SaveStore for FileSaveStore {
    fn save_blob(&mut self, name: &str, data: &[u8]) -> bool {
        let path = self.path_for(name);
        match fs::write(&path, data) {
            Ok(()) => {
                info!("Saved {} bytes to {}", data.len(), path.display());
                true
            }
            Err(e) => {
                warn!("Failed to write {}: {}", path.display(), e);
                false
            }
        }
    }

    fn load_blob(&mut self, name: &str) -> Option<Vec<u8>> {
        let path = self.path_for(name);
        match fs::read(&path) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }
}
