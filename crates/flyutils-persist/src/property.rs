//! Typed, cached handle onto a single stored key.
//!
//! # Invariants
//!
//! 1. **Reads are total**: `get()` never fails. A missing key, a value of the
//!    wrong shape, or a store read error all yield the default value.
//!
//! 2. **Null means absent**: setting a value that serializes to JSON `null`
//!    (e.g. `None` for an `Option<_>` property) removes the key instead of
//!    storing `null`.
//!
//! 3. **Cache follows the key**: the cached value is tagged with the key it
//!    was read under. When a key provider starts returning a different key,
//!    the next `get()` reads from the store again.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | Never set, or removed | Returns default |
//! | Type mismatch | Stored JSON does not deserialize to `T` | Returns default, logs `warn` |
//! | Store read error | Backend failure | Returns default, logs `warn` |
//! | Store write error | Backend failure | `set()` returns `Err`, cached value unchanged |

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::PersistError;
use crate::store::KeyValueStore;

type KeyProvider = Box<dyn Fn() -> String + Send + Sync>;

enum KeySource {
    Static(String),
    Dynamic(KeyProvider),
}

impl KeySource {
    fn resolve(&self) -> String {
        match self {
            Self::Static(key) => key.clone(),
            Self::Dynamic(provider) => provider(),
        }
    }
}

/// A stored value with a default, addressed by a fixed or computed key.
///
/// ```
/// use std::sync::Arc;
/// use flyutils_persist::{DefaultsProperty, MemoryStore};
///
/// let store = Arc::new(MemoryStore::new());
/// let launches = DefaultsProperty::new(store, "launch_count", 0u32);
/// assert_eq!(launches.get(), 0);
/// launches.set(launches.get() + 1).unwrap();
/// assert_eq!(launches.get(), 1);
/// ```
pub struct DefaultsProperty<T> {
    store: Arc<dyn KeyValueStore>,
    key: KeySource,
    default: T,
    cache: Mutex<Option<(String, T)>>,
}

impl<T> DefaultsProperty<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Property stored under a fixed `key`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, default: T) -> Self {
        Self::from_source(store, KeySource::Static(key.into()), default)
    }

    /// Property whose key is recomputed on every access, e.g. to scope a
    /// setting to the signed-in account.
    pub fn with_key_provider(
        store: Arc<dyn KeyValueStore>,
        provider: impl Fn() -> String + Send + Sync + 'static,
        default: T,
    ) -> Self {
        Self::from_source(store, KeySource::Dynamic(Box::new(provider)), default)
    }

    fn from_source(store: Arc<dyn KeyValueStore>, key: KeySource, default: T) -> Self {
        Self {
            store,
            key,
            default,
            cache: Mutex::new(None),
        }
    }

    /// The key this property currently resolves to.
    #[must_use]
    pub fn key(&self) -> String {
        self.key.resolve()
    }

    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Current value: cached, else stored, else the default.
    #[must_use]
    pub fn get(&self) -> T {
        let key = self.key();
        let mut cache = self.cache.lock();
        if let Some((cached_key, value)) = cache.as_ref() {
            if *cached_key == key {
                return value.clone();
            }
        }
        let value = self.load(&key);
        *cache = Some((key, value.clone()));
        value
    }

    /// Write `value` through to the store, then cache it.
    pub fn set(&self, value: T) -> Result<(), PersistError> {
        let key = self.key();
        let raw = serde_json::to_value(&value)?;
        let mut cache = self.cache.lock();
        if raw.is_null() {
            self.store.remove(&key)?;
        } else {
            self.store.set(&key, raw)?;
        }
        *cache = Some((key, value));
        Ok(())
    }

    /// Remove the stored value so the next `get()` yields the default.
    pub fn reset(&self) -> Result<(), PersistError> {
        let key = self.key();
        *self.cache.lock() = None;
        self.store.remove(&key)
    }

    /// Drop the cached value so the next `get()` re-reads the store.
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    fn load(&self, key: &str) -> T {
        match self.store.get(key) {
            Ok(Some(raw)) => match serde_json::from_value(raw) {
                Ok(value) => value,
                Err(err) => {
                    warn!(key, %err, "stored value has unexpected type; using default");
                    self.default.clone()
                }
            },
            Ok(None) => self.default.clone(),
            Err(err) => {
                warn!(key, %err, "store read failed; using default");
                self.default.clone()
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DefaultsProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match &self.key {
            KeySource::Static(key) => key.as_str(),
            KeySource::Dynamic(_) => "<dynamic>",
        };
        f.debug_struct("DefaultsProperty")
            .field("key", &key)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    fn memory() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn missing_key_yields_default() {
        let prop = DefaultsProperty::new(memory(), "volume", 5i64);
        assert_eq!(prop.get(), 5);
        assert_eq!(*prop.default_value(), 5);
    }

    #[test]
    fn set_writes_through() {
        let store = memory();
        let prop = DefaultsProperty::new(store.clone(), "volume", 5i64);
        prop.set(9).unwrap();
        assert_eq!(prop.get(), 9);
        assert_eq!(store.get("volume").unwrap(), Some(json!(9)));
    }

    #[test]
    fn reads_value_written_by_another_handle() {
        let store = memory();
        store.set("name", json!("kite")).unwrap();
        let prop = DefaultsProperty::new(store, "name", String::new());
        assert_eq!(prop.get(), "kite");
    }

    #[test]
    fn value_is_cached_until_invalidated() {
        let store = memory();
        let prop = DefaultsProperty::new(store.clone(), "n", 0u8);
        assert_eq!(prop.get(), 0);

        store.set("n", json!(3)).unwrap();
        assert_eq!(prop.get(), 0);

        prop.invalidate();
        assert_eq!(prop.get(), 3);
    }

    #[test]
    fn none_removes_key() {
        let store = memory();
        let prop: DefaultsProperty<Option<String>> =
            DefaultsProperty::new(store.clone(), "token", None);
        prop.set(Some("abc".into())).unwrap();
        assert!(store.contains("token").unwrap());

        prop.set(None).unwrap();
        assert!(!store.contains("token").unwrap());
        assert_eq!(prop.get(), None);
    }

    #[test]
    fn reset_restores_default() {
        let store = memory();
        let prop = DefaultsProperty::new(store.clone(), "flag", false);
        prop.set(true).unwrap();
        prop.reset().unwrap();
        assert!(!prop.get());
        assert!(store.is_empty());
    }

    #[test]
    #[traced_test]
    fn type_mismatch_falls_back_and_warns() {
        let store = memory();
        store.set("count", json!("not a number")).unwrap();
        let prop = DefaultsProperty::new(store, "count", 42u32);
        assert_eq!(prop.get(), 42);
        assert!(logs_contain("stored value has unexpected type"));
    }

    #[test]
    fn dynamic_key_is_resolved_per_access() {
        let store = memory();
        let user = Arc::new(AtomicUsize::new(1));
        let user_clone = Arc::clone(&user);
        let prop = DefaultsProperty::with_key_provider(
            store.clone(),
            move || format!("theme.{}", user_clone.load(Ordering::SeqCst)),
            String::from("light"),
        );

        prop.set("dark".into()).unwrap();
        assert_eq!(prop.key(), "theme.1");
        assert_eq!(prop.get(), "dark");

        user.store(2, Ordering::SeqCst);
        assert_eq!(prop.key(), "theme.2");
        assert_eq!(prop.get(), "light");
        assert_eq!(store.get("theme.1").unwrap(), Some(json!("dark")));
    }

    /// Reads succeed, writes always fail.
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<serde_json::Value>, PersistError> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: serde_json::Value) -> Result<(), PersistError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn remove(&self, _key: &str) -> Result<(), PersistError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let inner = MemoryStore::new();
        inner.set("level", json!(2)).unwrap();
        let prop = DefaultsProperty::new(Arc::new(ReadOnlyStore(inner)), "level", 0u8);
        assert_eq!(prop.get(), 2);

        assert!(matches!(prop.set(5), Err(PersistError::Io(_))));
        assert_eq!(prop.get(), 2);
        assert!(prop.reset().is_err());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Window {
        width: u32,
        height: u32,
    }

    #[test]
    fn structured_values() {
        let store = memory();
        let prop = DefaultsProperty::new(
            store.clone(),
            "window",
            Window {
                width: 800,
                height: 600,
            },
        );
        prop.set(Window {
            width: 1024,
            height: 768,
        })
        .unwrap();
        assert_eq!(
            store.get("window").unwrap(),
            Some(json!({ "width": 1024, "height": 768 }))
        );
        prop.invalidate();
        assert_eq!(prop.get().width, 1024);
    }

    #[test]
    fn debug_hides_provider() {
        let prop = DefaultsProperty::with_key_provider(memory(), || "k".into(), 1i32);
        let dbg = format!("{prop:?}");
        assert!(dbg.contains("<dynamic>"));
        assert!(dbg.contains("default: 1"));
    }
}
