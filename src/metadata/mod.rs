//! Metadata primitives consumed from the debugger.
//!
//! This layer owns everything that arrives with a compile request before any
//! symbol universe is built: raw per-module metadata blocks, the assembly
//! identities they declare, and the tokens the cursor uses to name methods and
//! types inside them.
//!
//! # Module Structure
//!
//! - [`token`] - Metadata tokens (table id + row index)
//! - [`identity`] - Assembly identity, versioning and strong-name keys
//! - [`block`] - Raw metadata blocks and the per-call working set

pub mod block;
pub mod identity;
pub mod token;
