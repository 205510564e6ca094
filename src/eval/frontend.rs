//! The seam between this core and the language front end.
//!
//! Parsing, binding and code generation for the expression language live behind
//! [`ExpressionFrontend`]. The driver in [`crate::eval::driver`] is generic over
//! it, which keeps this crate language-agnostic and lets tests substitute a
//! scripted front end.

use crate::{
    context::compilation::CompilationUnit,
    eval::{
        artifact::{Alias, CompiledArtifact, EvaluationFlags},
        diagnostics::Diagnostic,
    },
};

/// A language front end capable of compiling one expression against a
/// compilation unit.
pub trait ExpressionFrontend {
    /// Compile `expression` in the given unit.
    ///
    /// On failure returns every diagnostic the front end produced; the driver
    /// inspects them to distinguish user errors from missing-metadata failures.
    ///
    /// # Errors
    /// The diagnostics of a failed compile, at least one of error severity.
    fn compile_expression(
        &self,
        unit: &CompilationUnit,
        expression: &str,
        flags: EvaluationFlags,
        aliases: &[Alias],
    ) -> std::result::Result<CompiledArtifact, Vec<Diagnostic>>;
}
