//! Raw metadata blocks and the per-call working set.
//!
//! The debugger hands this core one [`MetadataBlock`] per loaded module: the raw
//! bytes of the capture shim's module manifest, parsed once into the module's
//! version id, declared assembly identity, assembly-reference table and
//! type-definition table. The core never mutates the underlying bytes; a block
//! keeps its buffer alive for as long as any compilation unit built from it is
//! cached (the buffer sits behind an [`Arc`]).
//!
//! # Module Manifest Layout
//!
//! All values little-endian; strings are 7-bit length-prefixed (length in bytes):
//!
//! ```text
//! u32      magic            b"DPMB"
//! u16      format version   currently 1
//! u16      flags            reserved, must be 0
//! [u8;16]  module version id (MVID)
//! identity declared assembly identity
//! u32      reference count, then that many identity records
//! u32      typedef count,   then that many typedef records
//!
//! identity record:
//!   utf16  name
//!   u16 x4 version (major, minor, build, revision)
//!   utf16  culture ("" = neutral)
//!   u8     key kind: 0 = none, 1 = token (u64), 2 = full key (prefixed bytes)
//!   u8     content type: 0 = default, 1 = windows runtime
//!
//! typedef record:
//!   u32    type token
//!   utf8   namespace ("" = global)
//!   utf8   name
//! ```
//!
//! # Key Components
//!
//! - [`MetadataBlock`] - One module's parsed manifest over its raw bytes
//! - [`MetadataBlockSet`] - Ordered, MVID-deduplicated working set for one call
//! - [`TypeDefRecord`] - One top-level type definition entry

use std::sync::Arc;

use uguid::Guid;

use crate::{
    file::parser::Parser,
    metadata::{
        identity::{AssemblyContentType, AssemblyIdentity, AssemblyVersion, PublicKeyIdentity},
        token::Token,
    },
    Error, Result,
};

/// Manifest magic, `b"DPMB"` read as a little-endian u32.
const MANIFEST_MAGIC: u32 = u32::from_le_bytes(*b"DPMB");

/// The single manifest format version this parser understands.
const MANIFEST_VERSION: u16 = 1;

/// One top-level type definition declared by a module.
///
/// This is the minimum surface the external binder needs for name lookup and
/// the duplicate-definition (ambiguity) check; members are resolved by the
/// front end against the debuggee directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefRecord {
    /// Metadata token of the type definition
    pub token: Token,
    /// Declaring namespace, empty for the global namespace
    pub namespace: String,
    /// Simple type name
    pub name: String,
}

impl TypeDefRecord {
    /// Namespace-qualified name, `Namespace.Name` or just `Name` for global types.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Check against a namespace/name pair.
    #[must_use]
    pub fn matches(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }
}

#[derive(Debug)]
struct BlockData {
    bytes: Vec<u8>,
    module_version_id: Guid,
    identity: AssemblyIdentity,
    assembly_refs: Vec<AssemblyIdentity>,
    type_defs: Vec<TypeDefRecord>,
}

/// One module's raw metadata plus its parsed manifest.
///
/// Immutable after construction and cheap to clone (shared via [`Arc`]), so a
/// cached compilation unit can hold onto its reference blocks without copying
/// buffers or pinning caller memory.
#[derive(Debug, Clone)]
pub struct MetadataBlock {
    inner: Arc<BlockData>,
}

impl MetadataBlock {
    /// Parse a module manifest from its raw bytes, taking ownership of the buffer.
    ///
    /// # Errors
    /// Returns [`Error::Empty`] for an empty buffer, [`crate::Error::Malformed`]
    /// for structural problems and [`crate::Error::OutOfBounds`] for truncation.
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Empty);
        }

        let mut parser = Parser::new(&bytes);

        let magic = parser.read_le::<u32>()?;
        if magic != MANIFEST_MAGIC {
            return Err(malformed_error!(
                "Bad module manifest magic - 0x{:08x}",
                magic
            ));
        }

        let version = parser.read_le::<u16>()?;
        if version != MANIFEST_VERSION {
            return Err(malformed_error!(
                "Unsupported manifest format version - {}",
                version
            ));
        }

        let flags = parser.read_le::<u16>()?;
        if flags != 0 {
            return Err(malformed_error!("Reserved manifest flags set - {}", flags));
        }

        let mut mvid = [0u8; 16];
        mvid.copy_from_slice(parser.read_bytes(16)?);
        let module_version_id = Guid::from_bytes(mvid);

        let identity = read_identity(&mut parser)?;

        let ref_count = parser.read_le::<u32>()? as usize;
        let mut assembly_refs = Vec::with_capacity(ref_count.min(256));
        for _ in 0..ref_count {
            assembly_refs.push(read_identity(&mut parser)?);
        }

        let typedef_count = parser.read_le::<u32>()? as usize;
        let mut type_defs = Vec::with_capacity(typedef_count.min(1024));
        for _ in 0..typedef_count {
            let token = Token::new(parser.read_le::<u32>()?);
            let namespace = parser.read_prefixed_string_utf8()?;
            let name = parser.read_prefixed_string_utf8()?;
            type_defs.push(TypeDefRecord {
                token,
                namespace,
                name,
            });
        }

        Ok(MetadataBlock {
            inner: Arc::new(BlockData {
                bytes,
                module_version_id,
                identity,
                assembly_refs,
                type_defs,
            }),
        })
    }

    /// The module's 128-bit version id.
    #[must_use]
    pub fn module_version_id(&self) -> Guid {
        self.inner.module_version_id
    }

    /// The assembly identity this module declares for itself.
    #[must_use]
    pub fn identity(&self) -> &AssemblyIdentity {
        &self.inner.identity
    }

    /// The module's assembly-reference table, in declaration order.
    #[must_use]
    pub fn assembly_refs(&self) -> &[AssemblyIdentity] {
        &self.inner.assembly_refs
    }

    /// The module's top-level type definitions, in declaration order.
    #[must_use]
    pub fn type_defs(&self) -> &[TypeDefRecord] {
        &self.inner.type_defs
    }

    /// Size of the raw manifest in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.bytes.len()
    }
}

fn read_identity(parser: &mut Parser<'_>) -> Result<AssemblyIdentity> {
    let name = parser.read_prefixed_string_utf16()?;
    if name.is_empty() {
        return Err(malformed_error!("Assembly name cannot be empty"));
    }

    let version = AssemblyVersion::new(
        parser.read_le::<u16>()?,
        parser.read_le::<u16>()?,
        parser.read_le::<u16>()?,
        parser.read_le::<u16>()?,
    );

    let culture = parser.read_prefixed_string_utf16()?;
    let culture = if culture.is_empty() {
        None
    } else {
        Some(culture)
    };

    let key = match parser.read_le::<u8>()? {
        0 => None,
        1 => Some(PublicKeyIdentity::Token(parser.read_le::<u64>()?)),
        2 => {
            let length = parser.read_7bit_encoded_int()? as usize;
            Some(PublicKeyIdentity::FullKey(
                parser.read_bytes(length)?.to_vec(),
            ))
        }
        kind => return Err(malformed_error!("Unknown public key kind - {}", kind)),
    };

    let content_type = AssemblyContentType::from_raw(parser.read_le::<u8>()?)?;

    Ok(AssemblyIdentity::new(
        name,
        version,
        culture,
        key,
        content_type,
    ))
}

/// Immutable-in-spirit, ordered collection of metadata blocks for one compile call.
///
/// Insertion order is preserved; a module (by MVID) appears at most once. The only
/// mutation the core performs is appending blocks fetched during the
/// missing-assembly retry protocol.
#[derive(Debug, Clone, Default)]
pub struct MetadataBlockSet {
    blocks: Vec<MetadataBlock>,
}

impl MetadataBlockSet {
    /// Create an empty block set.
    #[must_use]
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Build a set from blocks, dropping MVID duplicates (first occurrence wins).
    #[must_use]
    pub fn from_blocks(blocks: impl IntoIterator<Item = MetadataBlock>) -> Self {
        let mut set = Self::new();
        for block in blocks {
            set.push(block);
        }
        set
    }

    /// Append a block; returns `false` (and drops the block) if a block with the
    /// same MVID is already present.
    pub fn push(&mut self, block: MetadataBlock) -> bool {
        if self.find_module(block.module_version_id()).is_some() {
            return false;
        }

        self.blocks.push(block);
        true
    }

    /// Number of blocks in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` when the set holds no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate the blocks in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, MetadataBlock> {
        self.blocks.iter()
    }

    /// The blocks as a slice, in insertion order.
    #[must_use]
    pub fn blocks(&self) -> &[MetadataBlock] {
        &self.blocks
    }

    /// Find a block by module version id.
    #[must_use]
    pub fn find_module(&self, module_version_id: Guid) -> Option<&MetadataBlock> {
        self.blocks
            .iter()
            .find(|b| b.module_version_id() == module_version_id)
    }

    /// Returns `true` if any block declares the given assembly identity.
    #[must_use]
    pub fn contains_identity(&self, identity: &AssemblyIdentity) -> bool {
        self.blocks.iter().any(|b| b.identity() == identity)
    }
}

impl<'a> IntoIterator for &'a MetadataBlockSet {
    type Item = &'a MetadataBlock;
    type IntoIter = std::slice::Iter<'a, MetadataBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
