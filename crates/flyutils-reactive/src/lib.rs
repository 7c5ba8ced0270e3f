#![forbid(unsafe_code)]

//! Shared-state primitives for FlyUtils.
//!
//! This crate provides two thread-safe value containers:
//!
//! - [`ObservableBox`]: a value cell that notifies subscriber callbacks
//!   synchronously whenever a new value is committed.
//! - [`Subscription`]: RAII guard that unregisters its callback on drop.
//! - [`ThreadSafe`]: a reader/writer-locked value with in-place transforms.
//!
//! # Architecture
//!
//! `ObservableBox<T>` keeps its value behind a `RwLock` and its subscribers in
//! a `Mutex`-guarded map ordered by registration. Mutations and
//! (un)registrations are serialized by a per-box reentrant dispatch gate, so
//! callbacks observe writes in commit order and may re-enter the box from the
//! notifying thread.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per committed write.
//! 2. Subscribers are notified in registration order.
//! 3. A new subscriber receives the current value before `subscribe` returns.
//! 4. Once dropping a [`Subscription`] returns, its callback is never invoked
//!    again.

pub mod observable;
pub mod thread_safe;

pub use observable::{ObservableBox, Subscription, SubscriptionId};
pub use thread_safe::ThreadSafe;
