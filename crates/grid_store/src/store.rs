use std::io::Write;
use std::path::{Path, PathBuf};

use grid_core::StateDocument;
use serde::Serialize;

use crate::StoreError;

/// Raw bytes of the state file at one instant, or `None` if it did not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Option<Vec<u8>>);

impl Snapshot {
    pub fn existed(&self) -> bool {
        self.0.is_some()
    }
}

/// The single persisted `year -> district -> record` document.
///
/// Reads and writes are whole-file. Saves go through a sibling `.tmp` file
/// and a rename, so readers never observe a half-written document. There is
/// no cross-process locking: two processes doing read-modify-write on the
/// same file will lose updates (last writer wins).
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_err(err)),
        }
    }

    /// Load the document. A missing file is an error on this path.
    pub fn load(&self) -> Result<StateDocument, StoreError> {
        let bytes = self.read_bytes()?.ok_or_else(|| StoreError::Missing {
            path: self.path.clone(),
        })?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Load the document, treating a missing file as an empty store.
    ///
    /// Only for write paths: a file that exists but is unreadable or
    /// malformed is still an error.
    pub fn load_or_default(&self) -> Result<StateDocument, StoreError> {
        match self.load() {
            Err(StoreError::Missing { .. }) => Ok(StateDocument::default()),
            other => other,
        }
    }

    /// Write the whole document, pretty-printed with 4-space indentation.
    pub fn save(&self, document: &StateDocument) -> Result<(), StoreError> {
        let json = to_pretty_json(document)?;
        self.write_atomic(&json)?;
        tracing::debug!(path = %self.path.display(), bytes = json.len(), "state saved");
        Ok(())
    }

    /// Load (or start empty), apply `mutate`, save. Returns whatever `mutate` returns.
    pub fn update<T>(
        &self,
        mutate: impl FnOnce(&mut StateDocument) -> T,
    ) -> Result<T, StoreError> {
        let mut document = self.load_or_default()?;
        let out = mutate(&mut document);
        self.save(&document)?;
        Ok(out)
    }

    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        self.read_bytes().map(Snapshot)
    }

    /// Put the file back exactly as captured, removing it if it did not exist.
    pub fn restore(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        match &snapshot.0 {
            Some(bytes) => self.write_atomic(bytes),
            None => match std::fs::remove_file(&self.path) {
                Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(self.io_err(err)),
                _ => Ok(()),
            },
        }
    }

    /// Write to `<file>.tmp`, fsync, then rename over the target.
    fn write_atomic(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| self.io_err(err))?;
        }
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        let written = write_synced(&tmp_path, bytes)
            .and_then(|()| std::fs::rename(&tmp_path, &self.path));
        if let Err(err) = written {
            if let Err(cleanup) = std::fs::remove_file(&tmp_path) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %tmp_path.display(), error = %cleanup, "could not remove temp file");
                }
            }
            return Err(self.io_err(err));
        }
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn to_pretty_json(document: &StateDocument) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    document.serialize(&mut serializer)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_core::test_fixtures::sample_document;
    use tempfile::TempDir;

    #[test]
    fn save_uses_four_space_indent() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        store.save(&sample_document()).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("{\n    \"2024\": {\n        \"Kolar\""), "{text}");
    }

    #[test]
    fn save_leaves_no_tmp_file_behind() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        store.save(&sample_document()).unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["state.json"]);
    }

    #[test]
    fn failed_write_removes_tmp_file() {
        let dir = TempDir::new().unwrap();
        // The target is a non-empty directory, so the final rename fails.
        let target = dir.path().join("state.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("occupied"), b"x").unwrap();
        let store = StateStore::new(&target);

        assert!(store.save(&sample_document()).is_err());
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("static/data/state.json"));
        store.save(&StateDocument::default()).unwrap();
        assert!(store.exists());
    }
}
