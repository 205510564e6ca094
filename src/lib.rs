// Copyright 2025 dotprobe contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dotprobe
//!
//! A snapshot-bound expression-compilation core for .NET debugger engines.
//!
//! When a debugger stops a .NET process and the user asks for the value of an
//! expression, something has to compile that one expression against the exact
//! set of modules loaded in the debuggee at that instant. `dotprobe` is that
//! something's core: it owns the snapshot of per-module metadata, resolves a
//! consistent reference closure for the module the user is stopped in, builds
//! the compilation context a language front end binds against, and drives the
//! compile - including the retry protocol that fetches metadata for assemblies
//! the initial capture missed.
//!
//! The language front end itself (parsing, binding, code generation) sits
//! behind the [`eval::frontend::ExpressionFrontend`] trait; this crate is
//! language-agnostic.
//!
//! ## Architecture
//!
//! One evaluation request flows through three layers:
//!
//! 1. **[`metadata`]** - raw per-module metadata blocks, assembly identities
//!    and tokens, parsed from the capture shim's module manifests.
//! 2. **[`context`]** - reference-closure resolution over the blocks, and
//!    compilation units carrying visible locals plus the reuse envelope that
//!    lets the debugger cache a unit across steps.
//! 3. **[`eval`]** - the front-end seam, diagnostic classification, and the
//!    bounded missing-assembly retry loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotprobe::prelude::*;
//!
//! # fn load(_: &str) -> Vec<u8> { Vec::new() }
//! let mut blocks = MetadataBlockSet::new();
//! blocks.push(MetadataBlock::parse(load("App.dpmb"))?);
//! blocks.push(MetadataBlock::parse(load("mscorlib.dpmb"))?);
//!
//! let target = blocks.blocks()[0].module_version_id();
//! let references = resolve_references(&blocks, target, ReferenceKind::AllModules);
//! let builder = SnapshotCompilationBuilder::new(references, target)?;
//! let unit = builder.build_method_context(
//!     Token::new(0x0600_0001),
//!     1,
//!     0,
//!     &MethodDebugInfo::default(),
//! );
//!
//! // Hand `unit` to an ExpressionFrontend, or let eval::driver::compile_with_retry
//! // run the whole loop.
//! # Ok::<(), dotprobe::Error>(())
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
pub mod prelude;

/// Compilation contexts: reference resolution, snapshot builders, reuse envelopes.
pub mod context;

/// Expression compilation: front-end seam, diagnostics, retry protocol, driver.
pub mod eval;

/// Metadata primitives: blocks, assembly identities, tokens.
pub mod metadata;

/// Central error type of this crate.
pub use error::Error;

/// Cursor-based parser over module-manifest bytes.
pub use file::parser::Parser;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
