use thiserror::Error;

use uguid::Guid;

use crate::metadata::identity::AssemblyIdentity;

/// Helper macro for constructing [`Error::Malformed`] with source-location context.
///
/// Accepts either a plain message or a format string with arguments:
///
/// ```rust,ignore
/// return Err(malformed_error!("Bad manifest magic"));
/// return Err(malformed_error!("Unsupported format version - {}", version));
/// ```
#[macro_export]
macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        $crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Helper macro for constructing [`Error::OutOfBounds`].
#[macro_export]
macro_rules! out_of_bounds_error {
    () => {
        $crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The taxonomy follows the needs of a live debugging session: parse failures on module
/// manifests, user-facing expression diagnostics, the ambiguity and missing-module conditions
/// that arise during reference resolution, and the terminal transport fault raised when the
/// debuggee can no longer be reached.
///
/// # Error Categories
///
/// ## Manifest Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid module-manifest structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond manifest boundaries
/// - [`Error::Empty`] - Empty input provided
///
/// ## Compilation Errors
/// - [`Error::UserExpression`] - Final, non-retryable expression diagnostic
/// - [`Error::AmbiguousType`] - Same simple type name defined in two distinct assemblies
/// - [`Error::ModuleNotFound`] - Target module absent from the working block set
///
/// ## Session Errors
/// - [`Error::TransportFault`] - Metadata fetch could not complete (debuggee gone)
/// - [`Error::ReuseConstraintViolation`] - Caller reused a compilation unit outside its
///   validity envelope
#[derive(Error, Debug)]
pub enum Error {
    /// The module manifest is damaged and could not be parsed.
    ///
    /// Includes the source location where the malformation was detected, since a corrupt
    /// manifest usually indicates a capture-side bug rather than user input.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing a metadata block.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The target module is not present in the supplied metadata block set.
    ///
    /// Callers treat this as "cannot resolve" rather than a fatal condition: the debugger
    /// may retry once the module's metadata has been captured.
    #[error("Module {0} not found in the metadata block set")]
    ModuleNotFound(Guid),

    /// The expression could not be compiled and no retry can fix it.
    ///
    /// Carries the already-formatted diagnostic text of the first error reported by the
    /// language front end. Syntax errors, unknown identifiers, type mismatches and
    /// exhausted missing-assembly retries all surface through this variant.
    #[error("{0}")]
    UserExpression(String),

    /// The same simple type name resolves against two or more distinct assemblies.
    ///
    /// Never retried: adding metadata cannot fix an ambiguity, only reference-closure
    /// filtering at resolution time can.
    #[error("The type '{name}' exists in both '{first}' and '{second}'")]
    AmbiguousType {
        /// Namespace-qualified type name that was ambiguous
        name: String,
        /// Identity of the first assembly defining the type
        first: AssemblyIdentity,
        /// Identity of the second assembly defining the type
        second: AssemblyIdentity,
    },

    /// The metadata-fetch callback could not complete.
    ///
    /// Raised when the debuggee process has disconnected or its image is unreadable.
    /// This is terminal for the whole compile request and is never converted into an
    /// ordinary compile diagnostic.
    #[error("Metadata transport fault: {0}")]
    TransportFault(String),

    /// A compilation unit was reused outside its validity envelope.
    ///
    /// Indicates a programming error in the caller's cache: the contract is to refuse
    /// the reuse and signal that a rebuild is required.
    #[error("Method context reuse constraints are not satisfied - rebuild required")]
    ReuseConstraintViolation,
}
