#![forbid(unsafe_code)]

//! Reader/writer-locked value box.
//!
//! [`ThreadSafe<T>`] is the non-notifying sibling of
//! [`ObservableBox`](crate::ObservableBox): many readers may hold the value
//! concurrently, writers are exclusive, and every write is visible to any
//! read that happens after it returns.

use std::fmt;

use parking_lot::RwLock;

/// A value guarded by a reader/writer lock.
///
/// Unlike [`ObservableBox`](crate::ObservableBox) this type is not
/// reference-counted; wrap it in an `Arc` to share it between threads.
#[derive(Default)]
pub struct ThreadSafe<T> {
    value: RwLock<T>,
}

impl<T> ThreadSafe<T> {
    /// Wrap `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
    }

    /// Replace the value and return the previous one.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.value.write(), value)
    }

    /// Borrow the value under a shared lock.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Mutate the value under an exclusive lock.
    ///
    /// The whole closure runs atomically with respect to other readers and
    /// writers, so read-modify-write sequences are never lost.
    pub fn transform<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.value.write())
    }

    /// Consume the box and return the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Clone> ThreadSafe<T> {
    /// Clone the current value out of the box.
    #[must_use]
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T> From<T> for ThreadSafe<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for ThreadSafe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadSafe")
            .field("value", &*self.value.read())
            .finish()
    }
}
