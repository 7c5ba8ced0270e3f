#![forbid(unsafe_code)]

//! FlyUtils public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub use flyutils_reactive as reactive;
pub use flyutils_style as style;

#[cfg(feature = "persist")]
pub use flyutils_persist as persist;
#[cfg(feature = "reuse")]
pub use flyutils_reuse as reuse;

pub mod prelude {
    pub use flyutils_reactive::{ObservableBox, Subscription, ThreadSafe};
    pub use flyutils_style::{ColorSpace, HexColor, Rgba};

    #[cfg(feature = "persist")]
    pub use flyutils_persist::{DefaultsProperty, KeyValueStore, MemoryStore};
    #[cfg(feature = "file-store")]
    pub use flyutils_persist::{FileStore, FileStoreConfig};
    #[cfg(feature = "reuse")]
    pub use flyutils_reuse::{ElementKind, ReusePool, ViewReusable};
}
