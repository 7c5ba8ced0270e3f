//! Errors from key-value persistence.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors surfaced by stores and by [`DefaultsProperty::set`](crate::DefaultsProperty::set).
#[derive(Debug)]
pub enum PersistError {
    /// Reading or writing the backing file failed.
    Io(io::Error),
    /// A value could not be converted to or from JSON.
    Serialize(serde_json::Error),
    /// The backing file exists but is not a JSON object.
    Corrupt { path: PathBuf, reason: String },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "store I/O error: {err}"),
            Self::Serialize(err) => write!(f, "value serialization error: {err}"),
            Self::Corrupt { path, reason } => {
                write!(f, "corrupt store file '{}': {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::Corrupt { .. } => None,
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err)
    }
}
