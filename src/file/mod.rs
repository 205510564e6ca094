//! Binary reading primitives shared by the manifest parsing layer.
//!
//! Metadata blocks arrive as raw in-memory buffers captured from the debuggee;
//! there is no file or PE container at this layer, only bounds-checked byte access.
//!
//! # Key Components
//!
//! - [`io`] - Little-endian primitive readers and the [`io::BlockIO`] trait
//! - [`parser::Parser`] - Cursor-based parser used by
//!   [`crate::metadata::block::MetadataBlock`]

pub mod io;
pub mod parser;
