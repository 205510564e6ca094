//! Compiled-expression artifacts and their result metadata.
//!
//! A successful compile produces a small in-memory assembly the debugger
//! injects into the debuggee, plus [`ResultProperties`] describing how the
//! debugger should present and treat the value the entry method returns.

use bitflags::bitflags;
use uguid::Guid;

bitflags! {
    /// How the front end should treat the input text.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EvaluationFlags: u32 {
        /// Parse the text as a single expression
        const TREAT_AS_EXPRESSION = 0x01;
        /// Parse the text as a statement (expression statements, declarations)
        const TREAT_AS_STATEMENT = 0x02;
        /// Permit assignments, calls and other side-effecting constructs
        const ALLOW_SIDE_EFFECTS = 0x04;
    }
}

bitflags! {
    /// Properties of the compiled expression's result.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ResultFlags: u32 {
        /// The result is an assignable storage location
        const ASSIGNABLE = 0x01;
        /// The result is of boolean type (enables conditional-breakpoint use)
        const BOOLEAN = 0x02;
        /// The result is a method group rather than a value
        const METHOD = 0x04;
    }
}

/// Opaque dynamic/tuple-name payload attached to a result type.
///
/// Produced by the front end and consumed by the matching result formatter;
/// this core only transports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomTypeInfo {
    /// Identifies the payload format
    pub payload_type_id: Guid,
    /// Format-specific payload bytes
    pub payload: Vec<u8>,
}

/// Presentation metadata for a compiled expression's result.
#[derive(Debug, Clone, Default)]
pub struct ResultProperties {
    /// Display name of the result type, as the front end rendered it
    pub type_display_name: String,
    /// Result property flags
    pub flags: ResultFlags,
    /// Format specifiers trailing the expression text (e.g. `x, hex`)
    pub format_specifiers: Vec<String>,
    /// Dynamic/tuple-name payload, when the result type carries one
    pub custom_type_info: Option<CustomTypeInfo>,
}

/// The output of one successful expression compile.
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    /// The generated assembly image, ready for injection
    pub assembly_bytes: Vec<u8>,
    /// Namespace-qualified name of the synthesized host type
    pub type_name: String,
    /// Name of the entry method on the host type
    pub entry_method: String,
    /// Presentation metadata for the result
    pub result_properties: ResultProperties,
}

/// A pseudo-variable established by a previous evaluation (`$result`, `$1`,
/// object ids and the like), made visible to subsequent expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    /// Name as typed in expressions, including the leading `$` if any
    pub name: String,
    /// Debugger-internal full name of the underlying value
    pub full_name: String,
    /// Assembly-qualified type name of the value
    pub type_name: String,
}
