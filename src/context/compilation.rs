//! Snapshot-bound compilation units.
//!
//! A [`SnapshotCompilationBuilder`] wraps one resolved reference set and stamps
//! out [`CompilationUnit`]s for cursor positions inside its target module. The
//! symbol universe (the reference set plus the synthesized host-type name) is
//! built once and shared by every unit via [`Arc`], so producing a unit for a
//! new cursor position is cheap: only the scope-dependent state - visible
//! locals and the reuse envelope - is computed per unit.
//!
//! # Key Components
//!
//! - [`SnapshotCompilationBuilder`] - Per-target-module factory for units
//! - [`CompilationUnit`] - Everything the front end needs to bind one expression
//! - [`MethodDebugInfo`] / [`LocalScope`] / [`LocalVariable`] - Scope input from
//!   the debugger's symbol reader

use std::sync::Arc;

use log::debug;
use uguid::Guid;

use crate::{
    context::{
        references::ResolvedReferenceSet,
        reuse::{IlSpan, MethodContextReuseConstraints},
    },
    metadata::{identity::AssemblyIdentity, token::Token},
    Error, Result,
};

/// Name of the synthesized type that hosts compiled expression methods.
///
/// Unspeakable in source (no user type can collide with it) and recognized by
/// result formatters downstream.
pub const HOST_TYPE_NAME: &str = "<>x";

/// A local variable slot as recorded in the method's symbol information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    /// Zero-based local slot index in the method's local signature
    pub slot: u32,
    /// Source-level variable name
    pub name: String,
}

/// One lexical scope of a method body: an IL range and the locals it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalScope {
    /// Half-open IL range over which the scope's locals are live
    pub span: IlSpan,
    /// Locals declared directly by this scope
    pub locals: Vec<LocalVariable>,
}

/// Symbol-reader output for one method, as supplied by the debugger.
///
/// Scopes may nest and overlap arbitrarily; this core only ever filters them by
/// containment of the cursor offset. Reading symbol files is the debugger's
/// concern, not this crate's.
#[derive(Debug, Clone, Default)]
pub struct MethodDebugInfo {
    /// All lexical scopes of the method body
    pub scopes: Vec<LocalScope>,
    /// Standalone-signature token describing the method's local slots
    pub local_signature_token: Option<Token>,
}

impl MethodDebugInfo {
    /// The spans of all scopes, for reuse-envelope narrowing.
    pub fn scope_spans(&self) -> impl Iterator<Item = IlSpan> + '_ {
        self.scopes.iter().map(|s| s.span)
    }

    /// Locals visible at `il_offset`: the locals of every scope containing the
    /// offset, deduplicated by slot and ordered by slot index. When two
    /// containing scopes declare the same slot, the first such scope in
    /// `scopes` order wins; symbol readers emit scopes outermost-first, so
    /// callers that want the outer declaration supply them in that order.
    #[must_use]
    pub fn visible_locals(&self, il_offset: u32) -> Vec<LocalVariable> {
        let mut visible: Vec<LocalVariable> = Vec::new();
        for scope in &self.scopes {
            if !scope.span.contains(il_offset) {
                continue;
            }
            for local in &scope.locals {
                if !visible.iter().any(|v| v.slot == local.slot) {
                    visible.push(local.clone());
                }
            }
        }
        visible.sort_by_key(|v| v.slot);
        visible
    }
}

/// A successful type lookup in the symbol universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeResolution {
    /// Identity of the assembly defining the type
    pub identity: AssemblyIdentity,
    /// MVID of the defining module
    pub module_version_id: Guid,
    /// The type definition's metadata token
    pub token: Token,
}

/// The shared, cursor-independent half of every compilation unit built from one
/// reference set.
#[derive(Debug)]
pub struct SymbolUniverse {
    references: ResolvedReferenceSet,
    target_module: Guid,
    host_type_name: &'static str,
}

impl SymbolUniverse {
    /// The resolved references this universe binds against.
    #[must_use]
    pub fn references(&self) -> &ResolvedReferenceSet {
        &self.references
    }

    /// MVID of the module the cursor lives in.
    #[must_use]
    pub fn target_module(&self) -> Guid {
        self.target_module
    }

    /// Name of the synthesized host type.
    #[must_use]
    pub fn host_type_name(&self) -> &str {
        self.host_type_name
    }

    /// Look up a top-level type by namespace and simple name.
    ///
    /// Returns `Ok(None)` when no reference defines the type, and the resolution
    /// when exactly one assembly does. The target module is preferred over other
    /// references so that debuggee-internal types shadow same-named imports.
    ///
    /// # Errors
    /// Returns [`Error::AmbiguousType`] when two references with distinct
    /// identities both define the type, naming both candidates.
    pub fn find_type(&self, namespace: &str, name: &str) -> Result<Option<TypeResolution>> {
        // The target module shadows same-named types from other references,
        // regardless of its position in the resolution order.
        if let Some(block) = self.references.find_module(self.target_module) {
            if let Some(record) = block.type_defs().iter().find(|t| t.matches(namespace, name)) {
                return Ok(Some(TypeResolution {
                    identity: block.identity().clone(),
                    module_version_id: block.module_version_id(),
                    token: record.token,
                }));
            }
        }

        let mut found: Option<TypeResolution> = None;

        for block in &self.references {
            if block.module_version_id() == self.target_module {
                continue;
            }

            let Some(record) = block.type_defs().iter().find(|t| t.matches(namespace, name))
            else {
                continue;
            };

            let resolution = TypeResolution {
                identity: block.identity().clone(),
                module_version_id: block.module_version_id(),
                token: record.token,
            };

            match &found {
                None => found = Some(resolution),
                Some(existing) if existing.identity == resolution.identity => {}
                Some(existing) => {
                    return Err(Error::AmbiguousType {
                        name: record.full_name(),
                        first: existing.identity.clone(),
                        second: resolution.identity,
                    });
                }
            }
        }

        Ok(found)
    }
}

/// Where in the target module a compilation unit is anchored.
#[derive(Debug, Clone)]
pub enum ContextScope {
    /// Anchored to a type: static view, no locals, no reuse envelope.
    Type {
        /// Token of the anchoring type definition
        type_token: Token,
    },
    /// Anchored to an execution point inside a method body.
    Method {
        /// Token of the containing method
        method_token: Token,
        /// Edit-and-continue generation of the method body
        method_version: u32,
        /// IL offset of the cursor
        il_offset: u32,
        /// Locals visible at the cursor, slot-ordered
        locals: Vec<LocalVariable>,
        /// Token of the method's local signature, when symbols carry one
        local_signature_token: Option<Token>,
        /// Validity envelope for caching this unit
        reuse_constraints: MethodContextReuseConstraints,
    },
}

/// One bindable compilation context: shared universe plus cursor-specific scope.
///
/// Cheap to clone; cached units hold the universe alive through the [`Arc`].
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    universe: Arc<SymbolUniverse>,
    scope: ContextScope,
}

impl CompilationUnit {
    /// The shared symbol universe.
    #[must_use]
    pub fn universe(&self) -> &SymbolUniverse {
        &self.universe
    }

    /// The cursor-specific scope.
    #[must_use]
    pub fn scope(&self) -> &ContextScope {
        &self.scope
    }

    /// The reuse envelope, present only for method-scoped units.
    #[must_use]
    pub fn reuse_constraints(&self) -> Option<MethodContextReuseConstraints> {
        match &self.scope {
            ContextScope::Method {
                reuse_constraints, ..
            } => Some(*reuse_constraints),
            ContextScope::Type { .. } => None,
        }
    }

    /// Locals visible at the cursor; empty for type-scoped units.
    #[must_use]
    pub fn locals(&self) -> &[LocalVariable] {
        match &self.scope {
            ContextScope::Method { locals, .. } => locals,
            ContextScope::Type { .. } => &[],
        }
    }
}

/// Factory for compilation units over one resolved reference set and one target
/// module.
///
/// Construction validates that the target module is actually part of the
/// reference set; unit construction after that is infallible for type scopes
/// and cheap for method scopes.
#[derive(Debug)]
pub struct SnapshotCompilationBuilder {
    universe: Arc<SymbolUniverse>,
}

impl SnapshotCompilationBuilder {
    /// Create a builder over `references`, anchored to `target_module`.
    ///
    /// # Errors
    /// Returns [`Error::ModuleNotFound`] when the reference set does not contain
    /// the target module.
    pub fn new(references: ResolvedReferenceSet, target_module: Guid) -> Result<Self> {
        if references.find_module(target_module).is_none() {
            return Err(Error::ModuleNotFound(target_module));
        }

        debug!(
            "compilation builder over {} references, target {target_module}",
            references.len()
        );

        Ok(Self {
            universe: Arc::new(SymbolUniverse {
                references,
                target_module,
                host_type_name: HOST_TYPE_NAME,
            }),
        })
    }

    /// The universe shared by all units this builder produces.
    #[must_use]
    pub fn universe(&self) -> &SymbolUniverse {
        &self.universe
    }

    /// Build a unit anchored to a type definition in the target module.
    #[must_use]
    pub fn build_type_context(&self, type_token: Token) -> CompilationUnit {
        CompilationUnit {
            universe: Arc::clone(&self.universe),
            scope: ContextScope::Type { type_token },
        }
    }

    /// Build a unit anchored to an execution point inside a method body.
    ///
    /// Computes the visible locals and the reuse envelope from the supplied
    /// symbol information. A method with no recorded scopes yields no locals and
    /// the maximal reuse span.
    #[must_use]
    pub fn build_method_context(
        &self,
        method_token: Token,
        method_version: u32,
        il_offset: u32,
        debug_info: &MethodDebugInfo,
    ) -> CompilationUnit {
        let locals = debug_info.visible_locals(il_offset);
        let reuse_constraints = MethodContextReuseConstraints::calculate(
            self.universe.target_module,
            method_token,
            method_version,
            il_offset,
            debug_info.scope_spans(),
        );

        debug!(
            "method context {method_token} v{method_version} at IL {il_offset}: {} locals, reuse {}",
            locals.len(),
            reuse_constraints.valid_span()
        );

        CompilationUnit {
            universe: Arc::clone(&self.universe),
            scope: ContextScope::Method {
                method_token,
                method_version,
                il_offset,
                locals,
                local_signature_token: debug_info.local_signature_token,
                reuse_constraints,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::references::{resolve_references, ReferenceKind},
        metadata::block::MetadataBlockSet,
        test::factories::ModuleBuilder,
    };

    fn references_for(
        builders: &[&ModuleBuilder],
        target: Guid,
    ) -> ResolvedReferenceSet {
        let blocks = MetadataBlockSet::from_blocks(builders.iter().map(|b| b.build()));
        resolve_references(&blocks, target, ReferenceKind::AllModules)
    }

    fn scope(start: u32, end: u32, locals: &[(u32, &str)]) -> LocalScope {
        LocalScope {
            span: IlSpan::new(start, end),
            locals: locals
                .iter()
                .map(|(slot, name)| LocalVariable {
                    slot: *slot,
                    name: (*name).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_new_requires_target_module() {
        let app = ModuleBuilder::new("App").mvid([1; 16]);
        let refs = references_for(&[&app], Guid::from_bytes([1; 16]));

        assert!(SnapshotCompilationBuilder::new(refs.clone(), Guid::from_bytes([1; 16])).is_ok());
        assert!(matches!(
            SnapshotCompilationBuilder::new(refs, Guid::from_bytes([9; 16])),
            Err(Error::ModuleNotFound(_))
        ));
    }

    #[test]
    fn test_type_context_has_no_locals_or_reuse() {
        let app = ModuleBuilder::new("App").mvid([1; 16]);
        let refs = references_for(&[&app], Guid::from_bytes([1; 16]));
        let builder = SnapshotCompilationBuilder::new(refs, Guid::from_bytes([1; 16])).unwrap();

        let unit = builder.build_type_context(Token::new(0x02000002));
        assert!(unit.locals().is_empty());
        assert!(unit.reuse_constraints().is_none());
        assert_eq!(unit.universe().host_type_name(), "<>x");
    }

    #[test]
    fn test_method_context_locals_and_reuse() {
        let app = ModuleBuilder::new("App").mvid([1; 16]);
        let mvid = Guid::from_bytes([1; 16]);
        let refs = references_for(&[&app], mvid);
        let builder = SnapshotCompilationBuilder::new(refs, mvid).unwrap();

        let debug_info = MethodDebugInfo {
            scopes: vec![
                scope(0, 20, &[(0, "outer")]),
                scope(4, 12, &[(1, "inner")]),
                scope(14, 18, &[(2, "later")]),
            ],
            local_signature_token: Some(Token::new(0x11000001)),
        };

        let unit =
            builder.build_method_context(Token::new(0x06000001), 1, 6, &debug_info);

        let names: Vec<&str> = unit.locals().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);

        let constraints = unit.reuse_constraints().unwrap();
        assert_eq!(constraints.valid_span(), IlSpan::new(4, 12));
        assert!(constraints.are_satisfied(mvid, Token::new(0x06000001), 1, 6));
        assert!(!constraints.are_satisfied(mvid, Token::new(0x06000001), 1, 13));
    }

    #[test]
    fn test_visible_locals_dedup_by_slot() {
        let info = MethodDebugInfo {
            scopes: vec![
                scope(0, 10, &[(0, "x"), (1, "y")]),
                scope(2, 8, &[(1, "y"), (2, "z")]),
            ],
            local_signature_token: None,
        };

        let visible = info.visible_locals(5);
        let slots: Vec<u32> = visible.iter().map(|l| l.slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn test_visible_locals_first_scope_wins_on_shared_slot() {
        // Two containing scopes name the same slot differently; the earlier
        // scope's declaration survives deduplication.
        let info = MethodDebugInfo {
            scopes: vec![
                scope(0, 10, &[(0, "outer_name")]),
                scope(2, 8, &[(0, "inner_name")]),
            ],
            local_signature_token: None,
        };

        let visible = info.visible_locals(5);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "outer_name");

        // Flipping the declaration order flips the winner.
        let flipped = MethodDebugInfo {
            scopes: vec![
                scope(2, 8, &[(0, "inner_name")]),
                scope(0, 10, &[(0, "outer_name")]),
            ],
            local_signature_token: None,
        };
        assert_eq!(flipped.visible_locals(5)[0].name, "inner_name");
    }

    #[test]
    fn test_method_context_without_scopes() {
        let app = ModuleBuilder::new("App").mvid([1; 16]);
        let mvid = Guid::from_bytes([1; 16]);
        let refs = references_for(&[&app], mvid);
        let builder = SnapshotCompilationBuilder::new(refs, mvid).unwrap();

        let unit = builder.build_method_context(
            Token::new(0x06000001),
            1,
            0,
            &MethodDebugInfo::default(),
        );

        assert!(unit.locals().is_empty());
        assert_eq!(unit.reuse_constraints().unwrap().valid_span(), IlSpan::MAX);
    }

    #[test]
    fn test_find_type_unique_and_missing() {
        let app = ModuleBuilder::new("App")
            .mvid([1; 16])
            .type_def("MyApp", "Program", 0x02000002);
        let lib = ModuleBuilder::new("Lib")
            .mvid([2; 16])
            .type_def("Lib", "Helper", 0x02000005);
        let mvid = Guid::from_bytes([1; 16]);
        let refs = references_for(&[&app, &lib], mvid);
        let builder = SnapshotCompilationBuilder::new(refs, mvid).unwrap();

        let hit = builder.universe().find_type("Lib", "Helper").unwrap().unwrap();
        assert_eq!(hit.identity.name, "Lib");
        assert_eq!(hit.token, Token::new(0x02000005));

        assert!(builder.universe().find_type("Lib", "Absent").unwrap().is_none());
    }

    #[test]
    fn test_find_type_prefers_target_module() {
        let app = ModuleBuilder::new("App")
            .mvid([1; 16])
            .type_def("Shared", "Thing", 0x02000002);
        let lib = ModuleBuilder::new("Lib")
            .mvid([2; 16])
            .type_def("Shared", "Thing", 0x02000007);
        let mvid = Guid::from_bytes([1; 16]);
        let refs = references_for(&[&lib, &app], mvid);
        let builder = SnapshotCompilationBuilder::new(refs, mvid).unwrap();

        let hit = builder.universe().find_type("Shared", "Thing").unwrap().unwrap();
        assert_eq!(hit.module_version_id, mvid);
    }

    #[test]
    fn test_find_type_ambiguous_across_assemblies() {
        let app = ModuleBuilder::new("App").mvid([1; 16]);
        let lib_v1 = ModuleBuilder::new("Lib")
            .mvid([2; 16])
            .version(1, 0, 0, 0)
            .type_def("Lib", "Helper", 0x02000005);
        let lib_v2 = ModuleBuilder::new("Lib")
            .mvid([3; 16])
            .version(2, 0, 0, 0)
            .type_def("Lib", "Helper", 0x02000005);
        let mvid = Guid::from_bytes([1; 16]);
        let refs = references_for(&[&app, &lib_v1, &lib_v2], mvid);
        let builder = SnapshotCompilationBuilder::new(refs, mvid).unwrap();

        match builder.universe().find_type("Lib", "Helper") {
            Err(Error::AmbiguousType { name, first, second }) => {
                assert_eq!(name, "Lib.Helper");
                assert_ne!(first, second);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }
}
