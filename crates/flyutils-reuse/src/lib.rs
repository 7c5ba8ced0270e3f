#![forbid(unsafe_code)]

//! Reuse identifiers for list and grid cells.
//!
//! - [`ViewReusable`]: derives a stable reuse identifier from the type name.
//! - [`ReusePool`]: registers cell types by identifier and hands out
//!   recycled instances before building new ones.
//! - [`ElementKind`]: distinguishes cells from section headers, footers and
//!   other supplementary views that share identifiers.

pub mod pool;
pub mod reusable;

pub use pool::{ReuseError, ReusePool};
pub use reusable::{ElementKind, ViewReusable, short_type_name};
