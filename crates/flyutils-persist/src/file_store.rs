//! JSON-file backed store.
//!
//! Each suite is a single JSON object at `<directory>/<suite>.json`. The
//! whole document is loaded when the store is opened and rewritten after
//! every mutation. Writes go to a sibling temp file which is then renamed
//! over the existing one, so a crash mid-write leaves the previous document
//! intact.
//!
//! # Invariants
//!
//! 1. **One document per path**: while any handle to a suite file is alive,
//!    every `open` of that file returns the same shared [`FileStore`].
//! 2. **Memory follows disk**: a mutation becomes visible to `get` only
//!    after it has been written. A failed write leaves the store unchanged.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::PersistError;
use crate::store::{KeyValueStore, STANDARD_SUITE};

/// Configuration for a [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Directory holding the suite documents.
    pub directory: PathBuf,
    /// Suite name; becomes the file stem.
    pub suite: String,
    /// Write indented JSON.
    pub pretty: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            suite: STANDARD_SUITE.to_string(),
            pretty: false,
        }
    }
}

impl FileStoreConfig {
    /// Standard suite inside `directory`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::default().with_directory(directory)
    }

    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    #[must_use]
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = suite.into();
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Suite name actually used on disk.
    ///
    /// Names that are blank or could escape the directory fall back to
    /// [`STANDARD_SUITE`].
    #[must_use]
    pub fn effective_suite(&self) -> &str {
        let suite = self.suite.trim();
        let usable = !suite.is_empty()
            && !suite.starts_with('.')
            && !suite.contains(['/', '\\'])
            && !suite.contains('\0');
        if usable {
            suite
        } else {
            if !self.suite.is_empty() {
                warn!(suite = %self.suite, "unusable suite name; using standard suite");
            }
            STANDARD_SUITE
        }
    }

    /// Full path of the suite document.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.json", self.effective_suite()))
    }
}

static OPEN_STORES: LazyLock<Mutex<HashMap<PathBuf, Weak<FileStore>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Store persisting one JSON object per suite.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    pretty: bool,
    entries: RwLock<Map<String, Value>>,
}

impl FileStore {
    /// Open (or lazily create) the suite document described by `config`.
    ///
    /// A missing file is an empty store; nothing is written until the first
    /// mutation. If the same file is already open in this process the
    /// existing store is returned and `config.pretty` is ignored.
    pub fn open(config: &FileStoreConfig) -> Result<Arc<Self>, PersistError> {
        let path = std::path::absolute(config.path())?;
        let mut open_stores = OPEN_STORES.lock();
        if let Some(store) = open_stores.get(&path).and_then(Weak::upgrade) {
            debug!(path = %path.display(), "file store shared");
            return Ok(store);
        }
        open_stores.retain(|_, store| store.strong_count() > 0);

        let entries = load(&path)?;
        debug!(path = %path.display(), entries = entries.len(), "file store opened");
        let store = Arc::new(Self {
            path: path.clone(),
            pretty: config.pretty,
            entries: RwLock::new(entries),
        });
        open_stores.insert(path, Arc::downgrade(&store));
        Ok(store)
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy of the document, write the copy, and only
    /// then publish it. The write lock is held throughout so concurrent
    /// writers hit the disk in order.
    fn mutate(&self, mutate: impl FnOnce(&mut Map<String, Value>)) -> Result<(), PersistError> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        mutate(&mut next);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn flush(&self, entries: &Map<String, Value>) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(entries)?
        } else {
            serde_json::to_vec(entries)?
        };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), entries = entries.len(), "file store flushed");
        Ok(())
    }
}

fn load(path: &Path) -> Result<Map<String, Value>, PersistError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(err) => return Err(err.into()),
    };
    let corrupt = |reason: String| {
        warn!(path = %path.display(), %reason, "unreadable store file");
        PersistError::Corrupt {
            path: path.to_path_buf(),
            reason,
        }
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(corrupt(format!("expected a JSON object, found {}", kind(&other)))),
        Err(err) => Err(corrupt(err.to_string())),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, PersistError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), PersistError> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<(), PersistError> {
        if !self.entries.read().contains_key(key) {
            return Ok(());
        }
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn contains(&self, key: &str) -> Result<bool, PersistError> {
        Ok(self.entries.read().contains_key(key))
    }
}
