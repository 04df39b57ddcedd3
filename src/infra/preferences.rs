//! Preference stores: a JSON file on disk and an in-memory map.
//!
//! The file holds a flat object of string values. Every `set` rewrites the
//! whole file through a temporary sibling that is renamed into place, so a
//! crash never leaves a half-written file behind. Failures are logged and
//! otherwise ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::application::ports::{PreferenceKey, PreferenceStore};

use super::error::InfraError;
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::preferences";

type Entries = BTreeMap<String, String>;

/// Preferences persisted to a JSON file.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl FilePreferenceStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        debug!(path = %path.display(), keys = entries.len(), "preferences loaded");
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &Entries) -> Result<(), InfraError> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let encoded = serde_json::to_vec_pretty(entries).map_err(std::io::Error::from)?;
        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(&encoded)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| InfraError::Io(err.error))?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: PreferenceKey) -> Option<String> {
        rw_read(&self.entries, SOURCE, "get")
            .get(key.as_str())
            .cloned()
    }

    fn set(&self, key: PreferenceKey, value: &str) {
        let mut entries = rw_write(&self.entries, SOURCE, "set");
        if entries.get(key.as_str()).map(String::as_str) == Some(value) {
            return;
        }
        entries.insert(key.as_str().to_string(), value.to_string());
        if let Err(err) = self.persist(&entries) {
            warn!(
                key = key.as_str(),
                path = %self.path.display(),
                error = %err,
                "failed to persist preference"
            );
        }
    }
}

fn load_entries(path: &Path) -> Entries {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Entries::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "preferences unreadable; using defaults");
            return Entries::new();
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "preferences malformed; using defaults");
            Entries::new()
        }
    }
}

/// Process-local preferences, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    entries: RwLock<Entries>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: PreferenceKey) -> Option<String> {
        rw_read(&self.entries, SOURCE, "memory_get")
            .get(key.as_str())
            .cloned()
    }

    fn set(&self, key: PreferenceKey, value: &str) {
        rw_write(&self.entries, SOURCE, "memory_set")
            .insert(key.as_str().to_string(), value.to_string());
    }
}
