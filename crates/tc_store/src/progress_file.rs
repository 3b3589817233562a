//! File-backed fallback for day counters.
//!
//! Used only when the SQL store is unreachable during a progress-only save.
//! Holds day counters keyed by identifier hash; never credentials, never
//! thread references. Credential persistence has no fallback path.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct ProgressFile {
    path: PathBuf,
}

impl ProgressFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the stored day for a hash, if any.
    pub fn load_day(&self, identifier_hash: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.read_map()?.get(identifier_hash).copied())
    }

    /// Record the day for a hash, creating the file (and parent directory)
    /// on first write.
    pub fn save_day(&self, identifier_hash: &str, day: i64) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        map.insert(identifier_hash.to_string(), day);
        self.write_map(&map)?;
        tracing::warn!(
            hash = %&identifier_hash[..8.min(identifier_hash.len())],
            day,
            "day counter written to file fallback; reconcile once the store is reachable"
        );
        Ok(())
    }

    /// Drop the entry for a hash. Missing entries are ignored.
    pub fn remove(&self, identifier_hash: &str) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        if map.remove(identifier_hash).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn read_map(&self) -> Result<HashMap<String, i64>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let data = fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn write_map(&self, map: &HashMap<String, i64>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let file = ProgressFile::new(dir.path().join("progress.json"));
        assert_eq!(file.load_day("abc").unwrap(), None);

        file.save_day("abc", 3).unwrap();
        assert_eq!(file.load_day("abc").unwrap(), Some(3));

        file.save_day("abc", 4).unwrap();
        assert_eq!(file.load_day("abc").unwrap(), Some(4));
    }

    #[test]
    fn entries_are_independent() {
        let dir = tempdir().unwrap();
        let file = ProgressFile::new(dir.path().join("progress.json"));
        file.save_day("abc", 1).unwrap();
        file.save_day("def", 9).unwrap();

        assert_eq!(file.load_day("abc").unwrap(), Some(1));
        assert_eq!(file.load_day("def").unwrap(), Some(9));
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let file = ProgressFile::new(dir.path().join("progress.json"));
        file.save_day("abc", 1).unwrap();
        file.remove("abc").unwrap();
        assert_eq!(file.load_day("abc").unwrap(), None);
        file.remove("abc").unwrap();
    }

    #[test]
    fn creates_parent_directory() {
        let dir = tempdir().unwrap();
        let file = ProgressFile::new(dir.path().join("nested/dir/progress.json"));
        file.save_day("abc", 2).unwrap();
        assert_eq!(file.load_day("abc").unwrap(), Some(2));
    }
}
