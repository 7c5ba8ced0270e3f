#![forbid(unsafe_code)]

//! Color types for FlyUtils.
//!
//! This crate provides:
//! - [`Rgba`] normalized colors tagged with a [`ColorSpace`]
//! - [`Rgb8`] packed byte triples for `0xRRGGBB` literals
//! - [`HexColor`] sugar for building colors straight from integer literals

/// Hex color types and parsing.
pub mod color;

pub use color::{ColorParseError, ColorSpace, HexColor, Rgb8, Rgba};
