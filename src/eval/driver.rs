//! The expression compilation driver.
//!
//! One evaluation request arrives as a [`Cursor`] (where in the debuggee the
//! user is stopped), the expression text, and the working set of metadata
//! blocks. [`compile`] runs one attempt and classifies its failure;
//! [`compile_with_retry`] wraps that in the missing-assembly retry loop,
//! fetching metadata on demand until the compile succeeds, fails for a reason
//! metadata cannot fix, or the strike bound trips.

use log::{debug, info};
use uguid::Guid;

use crate::{
    context::{
        compilation::{CompilationUnit, MethodDebugInfo, SnapshotCompilationBuilder},
        references::{resolve_references, ReferenceKind},
        reuse::MethodContextReuseConstraints,
    },
    eval::{
        artifact::{Alias, CompiledArtifact, EvaluationFlags},
        diagnostics::{
            missing_assembly_identities, Diagnostic, DiagnosticArg, DiagnosticKind, Severity,
        },
        frontend::ExpressionFrontend,
        retry::{should_try_again_with_more_metadata_blocks, MetadataProvider},
    },
    metadata::{block::MetadataBlockSet, identity::AssemblyIdentity, token::Token},
    Error, Result,
};

/// An identity reported missing this many times aborts the retry loop.
///
/// The first report triggers a fetch; a second report of the same identity
/// means fetching it did not satisfy the reference and never will.
const MAX_IDENTITY_STRIKES: usize = 2;

/// Where the debuggee is stopped, as reported by the debugger.
#[derive(Debug, Clone)]
pub enum Cursor {
    /// Stopped at an execution point inside a method body.
    Method {
        /// MVID of the module containing the method
        module: Guid,
        /// Token of the method
        method_token: Token,
        /// Edit-and-continue generation of the method body
        method_version: u32,
        /// IL offset of the instruction pointer
        il_offset: u32,
        /// Symbol-reader output for the method
        debug_info: MethodDebugInfo,
    },
    /// Pinned to a type, with no execution state (interop or static contexts).
    Type {
        /// MVID of the module defining the type
        module: Guid,
        /// Token of the type definition
        type_token: Token,
    },
}

impl Cursor {
    /// MVID of the module the cursor lives in.
    #[must_use]
    pub fn module(&self) -> Guid {
        match self {
            Cursor::Method { module, .. } | Cursor::Type { module, .. } => *module,
        }
    }
}

/// A successful compile plus the cache key under which its unit may be reused.
#[derive(Debug, Clone)]
pub struct CompileSuccess {
    /// The compiled expression assembly and its result metadata
    pub artifact: CompiledArtifact,
    /// Reuse envelope; `None` for type-scoped cursors, which carry no
    /// execution state to constrain
    pub reuse_constraints: Option<MethodContextReuseConstraints>,
}

/// Outcome of one compile attempt.
#[derive(Debug)]
pub enum CompileOutcome {
    /// The front end produced an artifact.
    Succeeded(CompileSuccess),
    /// The compile failed only for want of uncaptured metadata; the caller may
    /// fetch the named identities and try again.
    MissingAssemblies {
        /// Identities to fetch, in first-report order without duplicates
        identities: Vec<AssemblyIdentity>,
        /// The diagnostics of the failed attempt, for strike accounting and
        /// final error reporting
        diagnostics: Vec<Diagnostic>,
    },
}

fn first_error_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .find(|d| d.severity == Severity::Error)
        .map(|d| d.message.clone())
        .unwrap_or_else(|| "expression compilation failed".to_string())
}

/// Map an ambiguous-type diagnostic onto [`Error::AmbiguousType`] when its
/// structured arguments are intact; otherwise fall back to the message text.
fn ambiguity_error(diagnostic: &Diagnostic) -> Error {
    let mut identities = diagnostic.args.iter().filter_map(|arg| match arg {
        DiagnosticArg::Identity(identity) => Some(identity),
        DiagnosticArg::Text(_) => None,
    });
    let name = diagnostic.args.iter().find_map(|arg| match arg {
        DiagnosticArg::Text(text) => Some(text.clone()),
        DiagnosticArg::Identity(_) => None,
    });

    match (name, identities.next(), identities.next()) {
        (Some(name), Some(first), Some(second)) => Error::AmbiguousType {
            name,
            first: first.clone(),
            second: second.clone(),
        },
        _ => Error::UserExpression(diagnostic.message.clone()),
    }
}

/// Run one compile attempt and classify the result.
///
/// A failure whose diagnostics name fetchable assemblies becomes
/// [`CompileOutcome::MissingAssemblies`]; everything else is final.
///
/// # Errors
/// [`Error::AmbiguousType`] when the front end reported a type ambiguity, and
/// [`Error::UserExpression`] for all other non-retryable diagnostics.
pub fn compile<F: ExpressionFrontend>(
    unit: &CompilationUnit,
    expression: &str,
    flags: EvaluationFlags,
    aliases: &[Alias],
    frontend: &F,
) -> Result<CompileOutcome> {
    match frontend.compile_expression(unit, expression, flags, aliases) {
        Ok(artifact) => Ok(CompileOutcome::Succeeded(CompileSuccess {
            artifact,
            reuse_constraints: unit.reuse_constraints(),
        })),
        Err(diagnostics) => {
            let identities = missing_assembly_identities(&diagnostics);
            if !identities.is_empty() {
                debug!(
                    "compile attempt failed, {} missing assemblies",
                    identities.len()
                );
                return Ok(CompileOutcome::MissingAssemblies {
                    identities,
                    diagnostics,
                });
            }

            if let Some(ambiguous) = diagnostics
                .iter()
                .find(|d| d.kind == DiagnosticKind::AmbiguousType)
            {
                return Err(ambiguity_error(ambiguous));
            }

            Err(Error::UserExpression(first_error_message(&diagnostics)))
        }
    }
}

fn build_unit(
    blocks: &MetadataBlockSet,
    cursor: &Cursor,
    kind: ReferenceKind,
) -> Result<CompilationUnit> {
    let references = resolve_references(blocks, cursor.module(), kind);
    let builder = SnapshotCompilationBuilder::new(references, cursor.module())?;

    Ok(match cursor {
        Cursor::Type { type_token, .. } => builder.build_type_context(*type_token),
        Cursor::Method {
            method_token,
            method_version,
            il_offset,
            debug_info,
            ..
        } => builder.build_method_context(*method_token, *method_version, *il_offset, debug_info),
    })
}

/// Compile an expression, fetching missing metadata on demand.
///
/// Each iteration rebuilds the reference closure over the (possibly grown)
/// block set, recompiles, and on a missing-assembly failure runs one round of
/// the retry protocol. The loop terminates because every iteration either adds
/// a block the set did not have, or fails: an identity reported
/// [`MAX_IDENTITY_STRIKES`] times, or a round that added nothing new, ends the
/// evaluation with the front end's own diagnostic.
///
/// # Errors
/// All of [`compile`]'s errors, plus [`Error::ModuleNotFound`] when the
/// cursor's module is absent from the block set and
/// [`Error::TransportFault`] from the metadata provider.
#[allow(clippy::too_many_arguments)]
pub fn compile_with_retry<F: ExpressionFrontend, P: MetadataProvider>(
    blocks: &mut MetadataBlockSet,
    cursor: &Cursor,
    expression: &str,
    flags: EvaluationFlags,
    aliases: &[Alias],
    frontend: &F,
    provider: &mut P,
    kind: ReferenceKind,
) -> Result<CompileSuccess> {
    let mut strikes: Vec<(AssemblyIdentity, usize)> = Vec::new();

    loop {
        let unit = build_unit(blocks, cursor, kind)?;

        let (identities, diagnostics) =
            match compile(&unit, expression, flags, aliases, frontend)? {
                CompileOutcome::Succeeded(success) => {
                    info!("expression compiled against {} blocks", blocks.len());
                    return Ok(success);
                }
                CompileOutcome::MissingAssemblies {
                    identities,
                    diagnostics,
                } => (identities, diagnostics),
            };

        for identity in &identities {
            let count = match strikes.iter().position(|(seen, _)| seen == identity) {
                Some(pos) => {
                    strikes[pos].1 += 1;
                    strikes[pos].1
                }
                None => {
                    strikes.push((identity.clone(), 1));
                    1
                }
            };

            if count >= MAX_IDENTITY_STRIKES {
                debug!("retry: giving up on {identity} after {count} reports");
                return Err(Error::UserExpression(first_error_message(&diagnostics)));
            }
        }

        if !should_try_again_with_more_metadata_blocks(provider, &identities, blocks)? {
            return Err(Error::UserExpression(first_error_message(&diagnostics)));
        }
    }
}
