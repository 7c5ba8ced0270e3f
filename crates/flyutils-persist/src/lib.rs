#![forbid(unsafe_code)]

//! Persisted key-value properties.
//!
//! # Role in FlyUtils
//! `flyutils-persist` stores small preference-style values under string keys
//! and exposes them through [`DefaultsProperty`], a typed handle that falls
//! back to a default whenever the stored data is missing or unusable.
//!
//! # Primary responsibilities
//! - **KeyValueStore**: the storage seam. Values are `serde_json::Value`, so
//!   any `Serialize + DeserializeOwned` type can be persisted.
//! - **MemoryStore**: process-local store with named suites.
//! - **FileStore**: one JSON document per suite on disk (feature
//!   `file-store`, on by default).
//! - **DefaultsProperty**: cached, typed access with static or computed keys.

pub mod error;
#[cfg(feature = "file-store")]
pub mod file_store;
pub mod property;
pub mod store;

pub use error::PersistError;
#[cfg(feature = "file-store")]
pub use file_store::{FileStore, FileStoreConfig};
pub use property::DefaultsProperty;
pub use store::{KeyValueStore, MemoryStore, STANDARD_SUITE};
