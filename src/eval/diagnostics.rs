//! Front-end diagnostics and missing-assembly inference.
//!
//! The external binder reports binding failures as [`Diagnostic`] values. Most
//! are surfaced to the user verbatim, but a known subset signals that binding
//! failed only because a referenced assembly's metadata was never captured.
//! [`missing_assembly_identities`] recognizes that subset and extracts the
//! identities worth fetching, which drives the retry protocol in
//! [`crate::eval::retry`].

use strum::{Display, EnumIter};

use crate::metadata::identity::AssemblyIdentity;

/// Severity of a front-end diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum Severity {
    /// Informational or suggestion-level output, never blocks compilation
    Info,
    /// Suspicious but compilable
    Warning,
    /// Binding or lowering failure, compilation produced no artifact
    Error,
}

/// Classification of a front-end diagnostic.
///
/// The set is deliberately small: only the kinds this core must react to get
/// their own variant, everything else travels as [`DiagnosticKind::Internal`]
/// with its message intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DiagnosticKind {
    /// The expression text failed to parse
    SyntaxError,
    /// An identifier bound to nothing in scope
    UnknownIdentifier,
    /// A name exists but is not available in the current context
    NameNotInContext,
    /// A type's defining assembly is not among the references
    TypeNotReferenced,
    /// A type was forwarded to an assembly that is not loaded
    TypeForwardedNotLoaded,
    /// A simple type name matched definitions in multiple assemblies
    AmbiguousType,
    /// Operand types do not fit the operation
    TypeMismatch,
    /// A query operator was used but the query-support library is absent
    QueryOperatorNotFound,
    /// Dynamic dispatch was used but the dynamic-support library is absent
    DynamicSupportMissing,
    /// Any other front-end failure
    Internal,
}

/// A structured argument attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticArg {
    /// An assembly identity, typically the one whose absence caused the failure
    Identity(AssemblyIdentity),
    /// Free-form text, such as the offending identifier
    Text(String),
}

/// One diagnostic produced by the expression front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Classification used for missing-assembly inference and error mapping
    pub kind: DiagnosticKind,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message, shown to the user as-is
    pub message: String,
    /// Structured arguments, in an order fixed per kind
    pub args: Vec<DiagnosticArg>,
}

impl Diagnostic {
    /// An error-severity diagnostic with no structured arguments.
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            args: Vec::new(),
        }
    }

    /// An error-severity diagnostic naming the assembly whose absence caused it.
    pub fn missing_assembly(
        kind: DiagnosticKind,
        message: impl Into<String>,
        identity: AssemblyIdentity,
    ) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            args: vec![DiagnosticArg::Identity(identity)],
        }
    }

    /// The ambiguous-type diagnostic, carrying both candidate assemblies in
    /// encounter order.
    pub fn ambiguous_type(
        type_name: impl Into<String>,
        first: AssemblyIdentity,
        second: AssemblyIdentity,
    ) -> Self {
        let type_name = type_name.into();
        Self {
            kind: DiagnosticKind::AmbiguousType,
            severity: Severity::Error,
            message: format!(
                "The type '{}' exists in both '{}' and '{}'",
                type_name,
                first.display_name(),
                second.display_name()
            ),
            args: vec![
                DiagnosticArg::Text(type_name),
                DiagnosticArg::Identity(first),
                DiagnosticArg::Identity(second),
            ],
        }
    }

    /// First identity argument, if any.
    #[must_use]
    pub fn first_identity(&self) -> Option<&AssemblyIdentity> {
        self.args.iter().find_map(|arg| match arg {
            DiagnosticArg::Identity(identity) => Some(identity),
            DiagnosticArg::Text(_) => None,
        })
    }
}

/// How a diagnostic kind maps to a fetchable assembly identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingIdentityRule {
    /// Not a missing-assembly diagnostic
    NotMissing,
    /// The missing identity is the diagnostic's first identity argument
    FirstIdentityArg,
    /// The missing identity is the well-known query-support library
    WellKnownQuerySupport,
    /// The missing identity is the well-known dynamic-support library
    WellKnownDynamicSupport,
}

fn rule_for(kind: DiagnosticKind) -> MissingIdentityRule {
    match kind {
        DiagnosticKind::TypeNotReferenced
        | DiagnosticKind::TypeForwardedNotLoaded
        | DiagnosticKind::NameNotInContext => MissingIdentityRule::FirstIdentityArg,
        DiagnosticKind::QueryOperatorNotFound => MissingIdentityRule::WellKnownQuerySupport,
        DiagnosticKind::DynamicSupportMissing => MissingIdentityRule::WellKnownDynamicSupport,
        DiagnosticKind::SyntaxError
        | DiagnosticKind::UnknownIdentifier
        | DiagnosticKind::AmbiguousType
        | DiagnosticKind::TypeMismatch
        | DiagnosticKind::Internal => MissingIdentityRule::NotMissing,
    }
}

/// Extract the assembly identities whose absence explains the given
/// diagnostics.
///
/// Walks error-severity diagnostics in order and collects, without duplicates,
/// the identity each missing-assembly kind designates. Returns an empty vector
/// when the failures are genuine user errors rather than capture gaps, which
/// tells the driver the expression cannot be rescued by fetching metadata.
#[must_use]
pub fn missing_assembly_identities(diagnostics: &[Diagnostic]) -> Vec<AssemblyIdentity> {
    let mut missing: Vec<AssemblyIdentity> = Vec::new();

    for diagnostic in diagnostics {
        if diagnostic.severity != Severity::Error {
            continue;
        }

        let identity = match rule_for(diagnostic.kind) {
            MissingIdentityRule::NotMissing => continue,
            MissingIdentityRule::FirstIdentityArg => {
                match diagnostic.first_identity() {
                    Some(identity) => identity.clone(),
                    // Kind promises an identity argument but the front end
                    // omitted it; nothing to fetch.
                    None => continue,
                }
            }
            MissingIdentityRule::WellKnownQuerySupport => {
                AssemblyIdentity::query_support_library()
            }
            MissingIdentityRule::WellKnownDynamicSupport => {
                AssemblyIdentity::dynamic_support_library()
            }
        };

        if !missing.contains(&identity) {
            missing.push(identity);
        }
    }

    missing
}
