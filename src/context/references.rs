//! Reference resolution: choosing the modules a symbol universe is built over.
//!
//! The debugger hands over one metadata block per loaded module, with no
//! guarantee of uniqueness: the same assembly may be loaded twice, two versions
//! of one assembly may coexist, and a compile-time contract core library may sit
//! alongside the loader-provided implementation that replaced it. This module
//! collapses that multiset into the minimal consistent
//! [`ResolvedReferenceSet`] for a given target module.
//!
//! # Duplicate Policy
//!
//! - Exact identity duplicates: first occurrence wins.
//! - Same name+version+culture differing only in signing: the strong-named
//!   block wins deterministically over the weak-named one.
//! - Core-library facades: when two core-library blocks share a simple name,
//!   the one that actually defines types (the loaded implementation) wins over
//!   the empty contract facade, regardless of version.
//! - Same simple name, different versions, not a core-library pair: both are
//!   kept. The ambiguity, if any, surfaces at type-lookup time; see the policy
//!   discussion in `DESIGN.md`.
//!
//! Output order is the first-occurrence input order after filtering, which makes
//! resolution deterministic and idempotent.

use std::collections::VecDeque;

use log::debug;
use uguid::Guid;

use crate::metadata::{
    block::{MetadataBlock, MetadataBlockSet},
    identity::AssemblyIdentity,
};

/// Which modules participate in the symbol universe.
///
/// This is the explicit policy knob for the duplicate-version question: the
/// default mode keeps every loaded module (duplicates surface as ambiguities),
/// while the referenced-only mode shrinks the universe to the target module's
/// transitive reference closure for ambiguity-sensitive resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Include every distinct module present in the block set.
    AllModules,
    /// Restrict to modules transitively reachable from the target module's own
    /// assembly-reference table (the target itself is always included).
    ReferencedModulesOnly,
}

/// An ordered, duplicate-free sequence of metadata blocks chosen as the
/// reference closure for one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferenceSet {
    blocks: Vec<MetadataBlock>,
}

impl ResolvedReferenceSet {
    /// The empty set, returned when the target module cannot be found.
    #[must_use]
    pub fn empty() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Number of references in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` when the set holds no references.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate the references in resolution order.
    pub fn iter(&self) -> std::slice::Iter<'_, MetadataBlock> {
        self.blocks.iter()
    }

    /// The references as a slice, in resolution order.
    #[must_use]
    pub fn blocks(&self) -> &[MetadataBlock] {
        &self.blocks
    }

    /// Find a reference by module version id.
    #[must_use]
    pub fn find_module(&self, module_version_id: Guid) -> Option<&MetadataBlock> {
        self.blocks
            .iter()
            .find(|b| b.module_version_id() == module_version_id)
    }

    /// Returns `true` if the set contains a block with exactly this identity.
    #[must_use]
    pub fn contains_identity(&self, identity: &AssemblyIdentity) -> bool {
        self.blocks.iter().any(|b| b.identity() == identity)
    }

    /// All references sharing a simple assembly name (case-insensitive).
    ///
    /// Feeds the front end's duplicate-definition check: more than one hit for a
    /// type's declaring assembly name means lookups by simple name can be
    /// ambiguous in this universe.
    #[must_use]
    pub fn by_simple_name(&self, name: &str) -> Vec<&MetadataBlock> {
        self.blocks
            .iter()
            .filter(|b| b.identity().name.eq_ignore_ascii_case(name))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ResolvedReferenceSet {
    type Item = &'a MetadataBlock;
    type IntoIter = std::slice::Iter<'a, MetadataBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Build the minimal consistent reference set for `target_module`.
///
/// Walks `blocks` in input order, restricts to the reference closure when
/// `kind` is [`ReferenceKind::ReferencedModulesOnly`], then applies the
/// duplicate policy described in the module docs. Resolution is a pure
/// function of its inputs: the same block multiset in the same order always
/// produces the identical set.
///
/// If the target module is not present, the result is empty - the caller
/// treats that as "cannot resolve", not as a fatal error.
#[must_use]
pub fn resolve_references(
    blocks: &MetadataBlockSet,
    target_module: Guid,
    kind: ReferenceKind,
) -> ResolvedReferenceSet {
    if blocks.find_module(target_module).is_none() {
        debug!("reference resolution: target module {target_module} not in block set");
        return ResolvedReferenceSet::empty();
    }

    let included = match kind {
        ReferenceKind::AllModules => vec![true; blocks.len()],
        ReferenceKind::ReferencedModulesOnly => reference_closure(blocks, target_module),
    };

    let mut resolved: Vec<MetadataBlock> = Vec::new();
    for (block, included) in blocks.iter().zip(included) {
        if !included {
            continue;
        }

        let identity = block.identity();

        // Exact duplicate: first occurrence wins.
        if resolved.iter().any(|r| r.identity() == identity) {
            continue;
        }

        // Same name+version+culture differing only in signing: one entry,
        // strong-named block preferred.
        if let Some(pos) = resolved.iter().position(|r| {
            let existing = r.identity();
            existing.has_same_simple_name(identity)
                && existing.version == identity.version
                && existing.culture == identity.culture
        }) {
            if identity.is_strong_named() && !resolved[pos].identity().is_strong_named() {
                resolved[pos] = block.clone();
            }
            continue;
        }

        // Core-library facade unification: the loaded implementation defines
        // types, the compile-time contract does not.
        if identity.is_core_library() {
            if let Some(pos) = resolved
                .iter()
                .position(|r| r.identity().has_same_simple_name(identity))
            {
                if !block.type_defs().is_empty() && resolved[pos].type_defs().is_empty() {
                    resolved[pos] = block.clone();
                }
                continue;
            }
        }

        resolved.push(block.clone());
    }

    debug!(
        "reference resolution: {} of {} blocks selected for {target_module} ({kind:?})",
        resolved.len(),
        blocks.len()
    );

    ResolvedReferenceSet { blocks: resolved }
}

/// Mark the blocks transitively reachable from the target module's reference
/// table. A block satisfies a requirement per [`AssemblyIdentity::satisfies`];
/// every satisfying block is included so duplicates stay visible to the
/// duplicate-elimination pass.
fn reference_closure(blocks: &MetadataBlockSet, target_module: Guid) -> Vec<bool> {
    let mut included = vec![false; blocks.len()];
    let mut queue: VecDeque<AssemblyIdentity> = VecDeque::new();

    for (i, block) in blocks.iter().enumerate() {
        if block.module_version_id() == target_module {
            included[i] = true;
            queue.extend(block.assembly_refs().iter().cloned());
        }
    }

    while let Some(required) = queue.pop_front() {
        for (i, block) in blocks.iter().enumerate() {
            if !included[i] && block.identity().satisfies(&required) {
                included[i] = true;
                queue.extend(block.assembly_refs().iter().cloned());
            }
        }
    }

    included
}
