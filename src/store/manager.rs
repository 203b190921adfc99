// Cache store manager — opens, enumerates, and deletes named generations.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use super::generation::CacheGeneration;

/// Root of all cache generations managed by one worker deployment.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open a generation by name, creating it on first use.
    pub fn open(&self, name: &str) -> Result<CacheGeneration> {
        CacheGeneration::open(&self.root, name)
    }

    /// Names of every generation currently on disk, sorted.
    pub fn generation_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.root.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a whole generation and everything in it. Returns whether
    /// it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let dir = self.root.join(name);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        info!("deleted cache generation {}", name);
        Ok(true)
    }
}
