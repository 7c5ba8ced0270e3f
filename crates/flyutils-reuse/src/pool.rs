//! Registration and recycling of reusable views.
//!
//! # Invariants
//!
//! 1. **One type per slot**: a `(kind, identifier)` slot is bound to exactly
//!    one concrete type. Dequeuing with another type that happens to share
//!    the identifier is a [`ReuseError::TypeMismatch`], never a bad cast.
//!
//! 2. **Recycled first**: `dequeue` returns the most recently recycled
//!    instance when one exists and only calls the factory otherwise.
//!
//! 3. **Bounded free lists**: each slot keeps at most `max_recycled`
//!    instances; extras passed to `recycle` are dropped.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unregistered type | `dequeue`/`recycle` before `register` | `Err(NotRegistered)` |
//! | Identifier clash | Two types with the same identifier | `Err(TypeMismatch)` |
//! | Re-registration | `register` called twice | Factory replaced, free list cleared |

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::reusable::{ElementKind, ViewReusable};

/// Default cap on recycled instances kept per slot.
pub const DEFAULT_MAX_RECYCLED: usize = 16;

type Instance = Box<dyn Any + Send>;
type Factory = Box<dyn Fn() -> Instance + Send + Sync>;

struct Slot {
    type_id: TypeId,
    type_name: &'static str,
    factory: Factory,
    recycled: Vec<Instance>,
}

/// Errors from [`ReusePool`] lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReuseError {
    /// Nothing was registered for this kind and identifier.
    NotRegistered {
        kind: ElementKind,
        identifier: String,
    },
    /// The slot holds a different concrete type.
    TypeMismatch {
        kind: ElementKind,
        identifier: String,
        registered: &'static str,
    },
}

impl fmt::Display for ReuseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegistered { kind, identifier } => {
                write!(f, "no {kind} registered with identifier '{identifier}'")
            }
            Self::TypeMismatch {
                kind,
                identifier,
                registered,
            } => write!(
                f,
                "{kind} identifier '{identifier}' is registered for {registered}"
            ),
        }
    }
}

impl std::error::Error for ReuseError {}

/// Factory registry plus per-identifier free lists.
pub struct ReusePool {
    slots: HashMap<(ElementKind, String), Slot>,
    max_recycled: usize,
}

impl Default for ReusePool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReusePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReusePool")
            .field("slots", &self.slots.len())
            .field("max_recycled", &self.max_recycled)
            .finish()
    }
}

impl ReusePool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            max_recycled: DEFAULT_MAX_RECYCLED,
        }
    }

    /// Set the per-slot free-list cap (minimum 1).
    #[must_use]
    pub fn with_max_recycled(mut self, max: usize) -> Self {
        self.max_recycled = max.max(1);
        self
    }

    /// Register a cell type built with `Default`.
    pub fn register<V: ViewReusable + Default + Send>(&mut self) {
        self.register_kind_with(ElementKind::Cell, V::default);
    }

    /// Register a cell type with a custom factory.
    pub fn register_with<V: ViewReusable + Send>(
        &mut self,
        factory: impl Fn() -> V + Send + Sync + 'static,
    ) {
        self.register_kind_with(ElementKind::Cell, factory);
    }

    /// Register a header, footer or other supplementary view type.
    pub fn register_supplementary<V: ViewReusable + Default + Send>(&mut self, kind: ElementKind) {
        self.register_kind_with(kind, V::default);
    }

    /// Register `V` for `kind`, replacing any previous registration.
    pub fn register_kind_with<V: ViewReusable + Send>(
        &mut self,
        kind: ElementKind,
        factory: impl Fn() -> V + Send + Sync + 'static,
    ) {
        let slot = Slot {
            type_id: TypeId::of::<V>(),
            type_name: std::any::type_name::<V>(),
            factory: Box::new(move || Box::new(factory()) as Instance),
            recycled: Vec::new(),
        };
        self.slots.insert((kind, V::reuse_identifier()), slot);
    }

    /// Whether `V` is registered as a cell.
    #[must_use]
    pub fn is_registered<V: ViewReusable>(&self) -> bool {
        self.slots
            .get(&(ElementKind::Cell, V::reuse_identifier()))
            .is_some_and(|slot| slot.type_id == TypeId::of::<V>())
    }

    /// Number of recycled `V` cells waiting to be handed out.
    #[must_use]
    pub fn recycled_count<V: ViewReusable>(&self) -> usize {
        self.slots
            .get(&(ElementKind::Cell, V::reuse_identifier()))
            .map_or(0, |slot| slot.recycled.len())
    }

    /// A recycled cell if one is available, otherwise a new one.
    pub fn dequeue<V: ViewReusable + Send>(&mut self) -> Result<V, ReuseError> {
        self.dequeue_kind(ElementKind::Cell)
    }

    /// Like [`dequeue`](Self::dequeue) for supplementary views.
    pub fn dequeue_supplementary<V: ViewReusable + Send>(
        &mut self,
        kind: ElementKind,
    ) -> Result<V, ReuseError> {
        self.dequeue_kind(kind)
    }

    /// A recycled cell only; never calls the factory.
    pub fn try_dequeue<V: ViewReusable + Send>(&mut self) -> Option<V> {
        let slot = self
            .slots
            .get_mut(&(ElementKind::Cell, V::reuse_identifier()))?;
        if slot.type_id != TypeId::of::<V>() {
            return None;
        }
        let mut view = slot.recycled.pop()?.downcast::<V>().ok()?;
        view.prepare_for_reuse();
        Some(*view)
    }

    /// Return a cell to the pool.
    pub fn recycle<V: ViewReusable + Send>(&mut self, view: V) -> Result<(), ReuseError> {
        self.recycle_supplementary(ElementKind::Cell, view)
    }

    /// Return a supplementary view to the pool.
    pub fn recycle_supplementary<V: ViewReusable + Send>(
        &mut self,
        kind: ElementKind,
        view: V,
    ) -> Result<(), ReuseError> {
        let max_recycled = self.max_recycled;
        #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
        let (key, slot) = self.slot_for::<V>(kind)?;
        if slot.recycled.len() < max_recycled {
            slot.recycled.push(Box::new(view));
        } else {
            #[cfg(feature = "tracing")]
            trace!(kind = %key.0, identifier = %key.1, "reuse pool full; dropping view");
        }
        Ok(())
    }

    fn dequeue_kind<V: ViewReusable + Send>(&mut self, kind: ElementKind) -> Result<V, ReuseError> {
        let (key, slot) = self.slot_for::<V>(kind)?;
        let (instance, reused) = match slot.recycled.pop() {
            Some(instance) => (instance, true),
            None => ((slot.factory)(), false),
        };
        #[cfg(feature = "tracing")]
        trace!(kind = %key.0, identifier = %key.1, reused, "reuse dequeue");
        let mut view = instance.downcast::<V>().map_err(|_| ReuseError::TypeMismatch {
            kind: key.0.clone(),
            identifier: key.1.clone(),
            registered: slot.type_name,
        })?;
        if reused {
            view.prepare_for_reuse();
        }
        Ok(*view)
    }

    /// Look up the slot for `V`, checking it was registered with that type.
    fn slot_for<V: ViewReusable>(
        &mut self,
        kind: ElementKind,
    ) -> Result<((ElementKind, String), &mut Slot), ReuseError> {
        let key = (kind, V::reuse_identifier());
        let Some(slot) = self.slots.get_mut(&key) else {
            let (kind, identifier) = key;
            return Err(ReuseError::NotRegistered { kind, identifier });
        };
        if slot.type_id != TypeId::of::<V>() {
            let (kind, identifier) = key;
            return Err(ReuseError::TypeMismatch {
                kind,
                identifier,
                registered: slot.type_name,
            });
        }
        Ok((key, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "tracing")]
    use tracing_test::traced_test;

    #[derive(Debug, Default, PartialEq)]
    struct TextCell {
        text: String,
        serial: u32,
    }

    impl ViewReusable for TextCell {
        fn prepare_for_reuse(&mut self) {
            self.text.clear();
        }
    }

    #[derive(Debug, Default)]
    struct OtherCell;

    impl ViewReusable for OtherCell {
        fn reuse_identifier() -> String {
            "TextCell".into()
        }
    }

    #[derive(Debug, Default)]
    struct Header(u8);
    impl ViewReusable for Header {}

    #[test]
    fn unregistered_dequeue_fails() {
        let mut pool = ReusePool::new();
        assert_eq!(
            pool.dequeue::<TextCell>().unwrap_err(),
            ReuseError::NotRegistered {
                kind: ElementKind::Cell,
                identifier: "TextCell".into(),
            }
        );
        assert!(!pool.is_registered::<TextCell>());
    }

    #[test]
    fn dequeue_builds_when_empty() {
        let mut pool = ReusePool::new();
        pool.register::<TextCell>();
        assert!(pool.is_registered::<TextCell>());
        assert_eq!(pool.dequeue::<TextCell>().unwrap(), TextCell::default());
    }

    #[test]
    fn recycled_instance_is_prepared_and_reused() {
        let mut pool = ReusePool::new();
        pool.register::<TextCell>();
        pool.recycle(TextCell {
            text: "stale".into(),
            serial: 7,
        })
        .unwrap();
        assert_eq!(pool.recycled_count::<TextCell>(), 1);

        let cell = pool.dequeue::<TextCell>().unwrap();
        assert_eq!(cell.serial, 7);
        assert!(cell.text.is_empty());
        assert_eq!(pool.recycled_count::<TextCell>(), 0);
    }

    #[test]
    fn custom_factory_is_used() {
        let mut pool = ReusePool::new();
        pool.register_with(|| TextCell {
            text: String::new(),
            serial: 99,
        });
        assert_eq!(pool.dequeue::<TextCell>().unwrap().serial, 99);
    }

    #[test]
    fn try_dequeue_never_builds() {
        let mut pool = ReusePool::new();
        assert!(pool.try_dequeue::<TextCell>().is_none());
        pool.register::<TextCell>();
        assert!(pool.try_dequeue::<TextCell>().is_none());
        pool.recycle(TextCell::default()).unwrap();
        assert!(pool.try_dequeue::<TextCell>().is_some());
    }

    #[test]
    fn identifier_clash_is_type_mismatch() {
        let mut pool = ReusePool::new();
        pool.register::<TextCell>();
        match pool.dequeue::<OtherCell>() {
            Err(ReuseError::TypeMismatch {
                identifier,
                registered,
                ..
            }) => {
                assert_eq!(identifier, "TextCell");
                assert!(registered.ends_with("TextCell"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(pool.recycle(OtherCell).is_err());
        assert!(!pool.is_registered::<OtherCell>());
    }

    #[test]
    fn kinds_are_separate_slots() {
        let mut pool = ReusePool::new();
        pool.register_supplementary::<Header>(ElementKind::SectionHeader);
        assert!(pool.dequeue::<Header>().is_err());
        assert!(
            pool.dequeue_supplementary::<Header>(ElementKind::SectionFooter)
                .is_err()
        );

        pool.recycle_supplementary(ElementKind::SectionHeader, Header(3))
            .unwrap();
        let header = pool
            .dequeue_supplementary::<Header>(ElementKind::SectionHeader)
            .unwrap();
        assert_eq!(header.0, 3);
    }

    #[test]
    fn free_list_is_bounded() {
        let mut pool = ReusePool::new().with_max_recycled(2);
        pool.register::<TextCell>();
        for serial in 0..5 {
            pool.recycle(TextCell {
                text: String::new(),
                serial,
            })
            .unwrap();
        }
        assert_eq!(pool.recycled_count::<TextCell>(), 2);
    }

    #[test]
    fn reregistering_clears_free_list() {
        let mut pool = ReusePool::new();
        pool.register::<TextCell>();
        pool.recycle(TextCell::default()).unwrap();
        pool.register::<TextCell>();
        assert_eq!(pool.recycled_count::<TextCell>(), 0);
    }

    #[test]
    fn error_display() {
        let err = ReuseError::NotRegistered {
            kind: ElementKind::SectionFooter,
            identifier: "Footer".into(),
        };
        assert_eq!(
            err.to_string(),
            "no section-footer registered with identifier 'Footer'"
        );
    }

    #[cfg(feature = "tracing")]
    #[test]
    #[traced_test]
    fn dequeue_is_traced() {
        let mut pool = ReusePool::new();
        pool.register::<TextCell>();
        let _ = pool.dequeue::<TextCell>().unwrap();
        assert!(logs_contain("reuse dequeue"));
        assert!(logs_contain("reused=false"));
    }
}
