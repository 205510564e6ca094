//! Validity envelopes for reusing method-scoped compilation units.
//!
//! Building a symbol universe is the dominant cost of an expression compile, so
//! the debugger caches the unit built for a method and reuses it for subsequent
//! evaluation requests. [`MethodContextReuseConstraints`] is the cache-validity
//! key this core hands back with every method-scoped compilation: module
//! identity, method identity, method version (edit-and-continue generation) and
//! the instruction-pointer range over which the local-variable scope structure
//! is unchanged.
//!
//! The core itself holds no cache; it only constructs keys and answers
//! satisfiability queries. See the design notes in `DESIGN.md`.

use std::fmt;

use uguid::Guid;

use crate::metadata::token::Token;

/// A half-open `[start, end)` range of IL offsets within one method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IlSpan {
    /// Inclusive start offset
    pub start: u32,
    /// Exclusive end offset
    pub end: u32,
}

impl IlSpan {
    /// The maximal span `[0, u32::MAX)`.
    ///
    /// `u32::MAX` is the documented sentinel for "open at the high end"; no real
    /// method body reaches that offset.
    pub const MAX: Self = Self {
        start: 0,
        end: u32::MAX,
    };

    /// Create a new span. `start` must not exceed `end`.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns `true` if `offset` lies within the half-open range.
    #[must_use]
    pub const fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Narrow a candidate validity span around `probe_offset` using the lexical
    /// scope spans known for the method.
    ///
    /// Starting from `initial` (typically [`IlSpan::MAX`]), each scope narrows the
    /// running span:
    ///
    /// - a scope containing the probe intersects with the running span;
    /// - a scope entirely below the probe raises the running start to its end;
    /// - a scope entirely above the probe lowers the running end to its start.
    ///
    /// The result always contains `probe_offset`, is contained in `initial`, and
    /// is independent of the order the scopes are applied in. Scopes whose
    /// application would exclude the probe cannot arise from the rules above, so
    /// the running span never becomes empty or inverted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dotprobe::context::reuse::IlSpan;
    ///
    /// let span = IlSpan::calculate_reuse_span(
    ///     5,
    ///     IlSpan::MAX,
    ///     [
    ///         IlSpan::new(1, 9),
    ///         IlSpan::new(2, 8),
    ///         IlSpan::new(1, 3),
    ///         IlSpan::new(7, 9),
    ///     ],
    /// );
    /// assert_eq!(span, IlSpan::new(3, 7));
    /// ```
    #[must_use]
    pub fn calculate_reuse_span(
        probe_offset: u32,
        initial: IlSpan,
        scopes: impl IntoIterator<Item = IlSpan>,
    ) -> IlSpan {
        let mut span = initial;

        for scope in scopes {
            if scope.contains(probe_offset) {
                span = IlSpan::new(span.start.max(scope.start), span.end.min(scope.end));
            } else if scope.end <= probe_offset {
                span.start = span.start.max(scope.end);
            } else {
                // scope.start > probe_offset
                span.end = span.end.min(scope.start);
            }
        }

        span
    }
}

impl fmt::Display for IlSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The validity envelope of one method-scoped compilation unit.
///
/// A cached unit may be reused for a new evaluation request iff
/// [`are_satisfied`](Self::are_satisfied) holds for the request's module, method,
/// method version and IL offset. Callers owning the cache must rebuild when the
/// check fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodContextReuseConstraints {
    module_version_id: Guid,
    method_token: Token,
    method_version: u32,
    valid_span: IlSpan,
}

impl MethodContextReuseConstraints {
    /// Create constraints from their four components.
    #[must_use]
    pub fn new(
        module_version_id: Guid,
        method_token: Token,
        method_version: u32,
        valid_span: IlSpan,
    ) -> Self {
        Self {
            module_version_id,
            method_token,
            method_version,
            valid_span,
        }
    }

    /// Compute constraints for a method context built at `il_offset`, narrowing
    /// the maximal span over the method's lexical scope spans.
    #[must_use]
    pub fn calculate(
        module_version_id: Guid,
        method_token: Token,
        method_version: u32,
        il_offset: u32,
        scopes: impl IntoIterator<Item = IlSpan>,
    ) -> Self {
        Self::new(
            module_version_id,
            method_token,
            method_version,
            IlSpan::calculate_reuse_span(il_offset, IlSpan::MAX, scopes),
        )
    }

    /// Returns `true` iff a cached unit built under these constraints is valid for
    /// the given module, method, method version and IL offset.
    #[must_use]
    pub fn are_satisfied(
        &self,
        module_version_id: Guid,
        method_token: Token,
        method_version: u32,
        il_offset: u32,
    ) -> bool {
        self.module_version_id == module_version_id
            && self.method_token == method_token
            && self.method_version == method_version
            && self.valid_span.contains(il_offset)
    }

    /// Checked form of [`are_satisfied`](Self::are_satisfied) for cache
    /// lookups that want to propagate the refusal.
    ///
    /// # Errors
    /// Returns [`crate::Error::ReuseConstraintViolation`] when the cached unit
    /// must not be reused for this position.
    pub fn ensure_satisfied(
        &self,
        module_version_id: Guid,
        method_token: Token,
        method_version: u32,
        il_offset: u32,
    ) -> crate::Result<()> {
        if self.are_satisfied(module_version_id, method_token, method_version, il_offset) {
            Ok(())
        } else {
            Err(crate::Error::ReuseConstraintViolation)
        }
    }

    /// The IL range over which these constraints hold.
    #[must_use]
    pub fn valid_span(&self) -> IlSpan {
        self.valid_span
    }
}

impl fmt::Display for MethodContextReuseConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} v{} {}",
            self.module_version_id, self.method_token, self.method_version, self.valid_span
        )
    }
}
