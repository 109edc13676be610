//! Durable session state.
//!
//! Only the active playlist name survives a restart. Playlist contents are
//! session-scoped and are never written here.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key under which the active playlist name is stored.
pub const ACTIVE_PLAYLIST_KEY: &str = "activePlaylist_v3";

const SESSION_FILE: &str = "session.json";

/// A small string-to-string store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A flat JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable or
    /// corrupt one is logged and also starts empty.
    pub fn open(path: &Path) -> Self {
        let mut values = BTreeMap::new();
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(data) => match serde_json::from_str(&data) {
                    Ok(v) => values = v,
                    Err(e) => warn!(path = %path.display(), "corrupt session file, starting fresh: {}", e),
                },
                Err(e) => warn!(path = %path.display(), "could not read session file: {}", e),
            }
        }
        JsonFileStore {
            path: path.to_path_buf(),
            values,
        }
    }

    /// `<data dir>/tunebox/session.json`, if the platform has a data dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("tunebox").join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, json)
            .map_err(|e| Error::Persist(format!("write '{}': {}", self.path.display(), e)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.values.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            match previous {
                Some(old) => self.values.insert(key.to_string(), old),
                None => self.values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}
