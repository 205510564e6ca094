//! # dotprobe Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits from the dotprobe library. Import this module to get quick access
//! to everything a debugger host needs to drive expression compilation.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotprobe operations
pub use crate::Error;

/// The result type used throughout dotprobe
pub use crate::Result;

/// Low-level manifest parsing utilities
pub use crate::Parser;

// ================================================================================================
// Metadata
// ================================================================================================

/// Raw per-module metadata and the per-call working set
pub use crate::metadata::block::{MetadataBlock, MetadataBlockSet, TypeDefRecord};

/// Assembly identity, versioning and strong-name keys
pub use crate::metadata::identity::{
    AssemblyContentType, AssemblyIdentity, AssemblyVersion, PublicKeyIdentity,
};

/// Metadata tokens
pub use crate::metadata::token::Token;

// ================================================================================================
// Compilation Contexts
// ================================================================================================

/// Reference-closure resolution
pub use crate::context::references::{resolve_references, ReferenceKind, ResolvedReferenceSet};

/// Snapshot builders and compilation units
pub use crate::context::compilation::{
    CompilationUnit, ContextScope, LocalScope, LocalVariable, MethodDebugInfo,
    SnapshotCompilationBuilder, SymbolUniverse, TypeResolution,
};

/// Reuse envelopes for cached method contexts
pub use crate::context::reuse::{IlSpan, MethodContextReuseConstraints};

// ================================================================================================
// Expression Compilation
// ================================================================================================

/// Compiled artifacts, evaluation flags and result metadata
pub use crate::eval::artifact::{
    Alias, CompiledArtifact, CustomTypeInfo, EvaluationFlags, ResultFlags, ResultProperties,
};

/// Front-end diagnostics and missing-assembly inference
pub use crate::eval::diagnostics::{
    missing_assembly_identities, Diagnostic, DiagnosticArg, DiagnosticKind, Severity,
};

/// The language front-end seam
pub use crate::eval::frontend::ExpressionFrontend;

/// On-demand metadata fetching
pub use crate::eval::retry::{
    should_try_again_with_more_metadata_blocks, FetchError, MetadataProvider,
};

/// The compile driver and its outcomes
pub use crate::eval::driver::{
    compile, compile_with_retry, CompileOutcome, CompileSuccess, Cursor,
};
