#![forbid(unsafe_code)]

//! Thread-safe observable value with synchronous change notification.
//!
//! # Design
//!
//! [`ObservableBox<T>`] wraps a value of type `T` in shared, atomically
//! reference-counted storage. Every committed write notifies all registered
//! subscribers, in registration order, on the writing thread.
//!
//! Three locks live in the shared state:
//!
//! - a `RwLock<T>` for the value itself, so `get()` only ever waits for a
//!   single write's critical section;
//! - a `Mutex` around the subscriber map, held only long enough to insert,
//!   remove or snapshot entries;
//! - a reentrant dispatch gate that serializes commit-plus-notify with
//!   subscription and unsubscription. Because it is reentrant, a callback may
//!   call back into the same box from the notifying thread.
//!
//! # Performance
//!
//! | Operation     | Complexity                   |
//! |---------------|------------------------------|
//! | `get()`       | O(1) + clone of `T`          |
//! | `set()`       | O(S) where S = subscribers   |
//! | `subscribe()` | O(log S)                     |
//! | unsubscribe   | O(log S)                     |
//!
//! # Failure Modes
//!
//! - **Re-entrant `update`**: the closure passed to [`ObservableBox::update`]
//!   runs under the value's write lock. Calling `get()` on the same box from
//!   inside that closure deadlocks. Callbacks do not have this restriction.
//! - **Cross-thread waits inside callbacks**: a callback that blocks on
//!   another thread which is itself writing to or unsubscribing from the same
//!   box will deadlock, since the gate is held for the whole dispatch.
//! - **Panicking callback**: the panic unwinds through `set()`. Locks do not
//!   poison, so the box remains usable afterwards. A callback that panics
//!   during its initial call from `subscribe()` is unregistered before the
//!   panic leaves `subscribe()`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
#[cfg(feature = "tracing")]
use tracing::{debug, trace};

type Callback<T> = dyn Fn(&T) + Send + Sync;

/// Opaque token identifying a single registration on a box.
///
/// Ids are allocated in increasing order, which is also the notification
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric value, useful for log correlation.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

struct Subscriber<T> {
    /// Cleared on unsubscribe so an in-flight snapshot skips the callback.
    active: AtomicBool,
    callback: Box<Callback<T>>,
}

/// Shared interior for [`ObservableBox<T>`].
struct Shared<T> {
    gate: ReentrantMutex<()>,
    value: RwLock<T>,
    version: AtomicU64,
    next_id: AtomicU64,
    subscribers: Mutex<BTreeMap<SubscriptionId, Arc<Subscriber<T>>>>,
}

impl<T> Shared<T> {
    /// Invoke every live subscriber with `value`. Caller holds the gate.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn dispatch(&self, value: &T, version: u64) {
        let snapshot: Vec<Arc<Subscriber<T>>> =
            self.subscribers.lock().values().cloned().collect();
        #[cfg(feature = "tracing")]
        trace!(version, subscribers = snapshot.len(), "observable dispatch");
        for subscriber in &snapshot {
            if subscriber.active.load(Ordering::Acquire) {
                (subscriber.callback)(value);
            }
        }
    }
}

/// Type-erased view of a box's subscriber registry, so that [`Subscription`]
/// does not need to carry `T`.
trait Registry: Send + Sync {
    fn unregister(&self, id: SubscriptionId) -> bool;
    fn is_registered(&self, id: SubscriptionId) -> bool;
}

impl<T: Send + Sync> Registry for Shared<T> {
    fn unregister(&self, id: SubscriptionId) -> bool {
        // Waits for any in-flight dispatch on another thread to finish.
        let _gate = self.gate.lock();
        let removed = self.subscribers.lock().remove(&id);
        match removed {
            Some(subscriber) => {
                subscriber.active.store(false, Ordering::Release);
                #[cfg(feature = "tracing")]
                debug!(id = id.0, "observable unsubscribe");
                true
            }
            None => false,
        }
    }

    fn is_registered(&self, id: SubscriptionId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }
}

/// A thread-safe value cell that notifies subscribers on every write.
///
/// Cloning an `ObservableBox` creates a new handle to the **same** shared
/// state. The box is destroyed when the last handle is dropped; outstanding
/// [`Subscription`]s then become inert.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 per committed write.
/// 2. Subscribers are notified in registration order, once per write, in
///    commit order.
/// 3. A callback that calls `get()` sees its triggering value or a newer one.
/// 4. No callback runs after its `Subscription` has finished dropping.
pub struct ObservableBox<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ObservableBox<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableBox")
            .field("value", &*self.shared.value.read())
            .field("version", &self.shared.version.load(Ordering::Acquire))
            .field("subscriber_count", &self.shared.subscribers.lock().len())
            .finish()
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for ObservableBox<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + 'static> From<T> for ObservableBox<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + Send + Sync + 'static> ObservableBox<T> {
    /// Create a new box holding `value`, at version 0 with no subscribers.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                gate: ReentrantMutex::new(()),
                value: RwLock::new(value),
                version: AtomicU64::new(0),
                next_id: AtomicU64::new(0),
                subscribers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Get a clone of the latest committed value.
    #[must_use]
    pub fn get(&self) -> T {
        self.shared.value.read().clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// Writers are blocked while `f` runs.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.shared.value.read())
    }

    /// Commit `value` and notify every subscriber with it.
    pub fn set(&self, value: T) {
        let _gate = self.shared.gate.lock();
        let (version, ()) = self.commit(|current| *current = value.clone());
        self.shared.dispatch(&value, version);
    }

    /// Commit `value`, notify subscribers, and return the previous value.
    pub fn replace(&self, value: T) -> T {
        let _gate = self.shared.gate.lock();
        let (version, previous) =
            self.commit(|current| std::mem::replace(current, value.clone()));
        self.shared.dispatch(&value, version);
        previous
    }

    /// Modify the value in place, then notify subscribers with the result.
    ///
    /// `f` runs under the value's write lock and must not call back into
    /// this box.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let _gate = self.shared.gate.lock();
        let (version, value) = self.commit(|current| {
            f(current);
            current.clone()
        });
        self.shared.dispatch(&value, version);
    }

    /// Register `callback`, invoke it once with the current value, and return
    /// the guard that keeps it registered.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let _gate = self.shared.gate.lock();
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(Subscriber {
            active: AtomicBool::new(true),
            callback: Box::new(callback),
        });
        self.shared
            .subscribers
            .lock()
            .insert(id, Arc::clone(&subscriber));
        #[cfg(feature = "tracing")]
        debug!(id = id.0, "observable subscribe");

        // Built before the first call so a panicking callback unregisters
        // itself while unwinding.
        let registry: Arc<dyn Registry> = self.shared.clone();
        let subscription = Subscription {
            id,
            registry: Some(Arc::downgrade(&registry)),
        };

        let current = self.get();
        (subscriber.callback)(&current);
        subscription
    }

    /// Number of commits since construction.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.version.load(Ordering::Acquire)
    }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    /// Apply `mutate` under the write lock and bump the version.
    /// Caller holds the gate.
    fn commit<R>(&self, mutate: impl FnOnce(&mut T) -> R) -> (u64, R) {
        let mut current = self.shared.value.write();
        let out = mutate(&mut current);
        let version = self.shared.version.fetch_add(1, Ordering::AcqRel) + 1;
        (version, out)
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ObservableBox<T> {
    /// Commit `value` only if it differs from the current value.
    ///
    /// Returns `true` when a write was committed and subscribers notified.
    pub fn set_if_changed(&self, value: T) -> bool {
        let _gate = self.shared.gate.lock();
        if *self.shared.value.read() == value {
            return false;
        }
        self.set(value);
        true
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the `Subscription` removes the callback from its box. The guard
/// only holds a weak reference to the box, so it never keeps the box alive;
/// if the box is gone the drop is a no-op.
#[must_use = "dropping a Subscription immediately unsubscribes its callback"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Option<Weak<dyn Registry>>,
}

impl Subscription {
    /// Identifier of this registration.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the callback is still registered with a live box.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|registry| registry.is_registered(self.id))
    }

    /// Unregister now. Equivalent to dropping the guard.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.unregister(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
