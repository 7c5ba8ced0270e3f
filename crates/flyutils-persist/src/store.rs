//! Storage seam and the in-process backend.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::error::PersistError;

/// Suite used when none (or an unusable one) is requested.
pub const STANDARD_SUITE: &str = "standard";

/// A string-keyed store of JSON values.
///
/// Implementations must be safe to share between threads. A missing key is
/// `Ok(None)`, never an error.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Value>, PersistError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Value) -> Result<(), PersistError>;

    /// Delete `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), PersistError>;

    /// Whether `key` currently holds a value.
    fn contains(&self, key: &str) -> Result<bool, PersistError> {
        Ok(self.get(key)?.is_some())
    }
}

static SUITES: LazyLock<Mutex<HashMap<String, Arc<MemoryStore>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// A fresh, private store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared store for [`STANDARD_SUITE`].
    #[must_use]
    pub fn standard() -> Arc<Self> {
        Self::suite(STANDARD_SUITE)
    }

    /// The shared store for a named suite. Every call with the same name
    /// returns the same store; a blank name yields the standard suite.
    #[must_use]
    pub fn suite(name: &str) -> Arc<Self> {
        let name = match name.trim() {
            "" => STANDARD_SUITE,
            trimmed => trimmed,
        };
        let mut suites = SUITES.lock();
        Arc::clone(suites.entry(name.to_string()).or_default())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, PersistError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), PersistError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, PersistError> {
        Ok(self.entries.read().contains_key(key))
    }
}
