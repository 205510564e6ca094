//! Symbol universes and compilation contexts.
//!
//! This layer turns the raw per-module metadata of [`crate::metadata`] into the
//! state an expression front end binds against: a deduplicated reference
//! closure, a shared symbol universe over it, and per-cursor compilation units
//! carrying visible locals and cache-validity envelopes.
//!
//! # Module Structure
//!
//! - [`references`] - Reference-closure resolution and duplicate elimination
//! - [`compilation`] - The snapshot builder and its compilation units
//! - [`reuse`] - Method-context reuse constraints and IL spans

pub mod compilation;
pub mod references;
pub mod reuse;
