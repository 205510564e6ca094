//! Assembly identity for snapshot reference resolution.
//!
//! Every metadata block handed in by the debugger declares the identity of the
//! assembly it belongs to: simple name, four-part version, culture, signing key
//! and content-type flag. Duplicate elimination, reference-closure walking and
//! missing-assembly reporting all key off this value, so equality must be
//! by-value and independent of how the signing key happens to be stored
//! (full public key in one block, derived token in another).
//!
//! # Key Components
//!
//! - [`AssemblyIdentity`] - Complete assembly identification
//! - [`AssemblyVersion`] - Four-part version numbering (major.minor.build.revision)
//! - [`PublicKeyIdentity`] - Strong-name key, either a full key or its 8-byte token
//! - [`AssemblyContentType`] - Default vs. Windows Runtime packaging
//!
//! # Equality Semantics
//!
//! Two identities are equal when name (case-insensitive), version, culture,
//! content type and the *derived* public key token agree. A full public key and
//! the token computed from it therefore compare equal, which is what makes a
//! block captured from the loader unify with a reference read out of another
//! module's reference table.
//!
//! # Examples
//!
//! ```rust
//! use dotprobe::metadata::identity::{AssemblyIdentity, AssemblyVersion};
//!
//! let identity = AssemblyIdentity::parse(
//!     "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
//! )?;
//! assert_eq!(identity.name, "mscorlib");
//! assert_eq!(identity.version, AssemblyVersion::new(4, 0, 0, 0));
//! assert!(identity.is_strong_named());
//! # Ok::<(), dotprobe::Error>(())
//! ```

use std::{fmt, fmt::Write as _, str::FromStr};

use sha1::{Digest, Sha1};

use crate::{Error, Result};

/// Simple names the runtime treats as the core library.
///
/// Used by the reference resolver's facade unification: when a compile-time
/// contract core library and the loader-provided replacement are both present,
/// the replacement wins (see [`crate::context::references`]).
pub const CORE_LIBRARY_NAMES: &[&str] = &[
    "mscorlib",
    "System.Runtime",
    "System.Private.CoreLib",
    "netstandard",
];

/// Four-part version numbering for .NET assemblies.
///
/// Versions are compared component-wise in order: major, minor, build, revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssemblyVersion {
    /// Major version component
    pub major: u16,
    /// Minor version component
    pub minor: u16,
    /// Build version component
    pub build: u16,
    /// Revision version component
    pub revision: u16,
}

impl AssemblyVersion {
    /// Sentinel value (0.0.0.0) representing an unknown or unspecified version.
    pub const UNKNOWN: Self = Self {
        major: 0,
        minor: 0,
        build: 0,
        revision: 0,
    };

    /// Create a new assembly version with the specified components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Check if this version represents the unknown/unspecified sentinel (0.0.0.0).
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.build == 0 && self.revision == 0
    }

    /// Check if this version can satisfy a requirement for `required`.
    ///
    /// Follows the standard binding policy for strong-named assemblies: an unknown
    /// requirement accepts anything; otherwise the major versions must match and
    /// this version must be greater than or equal to the requirement.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dotprobe::metadata::identity::AssemblyVersion;
    ///
    /// let v4_0 = AssemblyVersion::new(4, 0, 0, 0);
    /// let v4_5 = AssemblyVersion::new(4, 5, 0, 0);
    ///
    /// assert!(v4_5.is_compatible_with(&v4_0));
    /// assert!(!v4_0.is_compatible_with(&v4_5));
    /// ```
    #[must_use]
    pub fn is_compatible_with(&self, required: &AssemblyVersion) -> bool {
        if required.is_unknown() {
            return true;
        }

        self.major == required.major && *self >= *required
    }

    /// Parse an assembly version from string representation.
    ///
    /// Supports "1.2.3.4" down to single-component forms; omitted components
    /// default to zero.
    ///
    /// # Errors
    /// Returns an error if the version string has an invalid format.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.split('.').collect();

        if parts.is_empty() || parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", version_str));
        }

        let mut components = [0u16; 4];
        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: {}", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Strong-name signing identity of an assembly.
///
/// Either the full public key as captured from the loaded module, or the 8-byte
/// token a reference table stores. The token is derived from the full key as the
/// last eight bytes of its SHA-1 digest, reversed - the standard strong-name
/// token derivation - so both representations of the same key unify.
#[derive(Debug, Clone)]
pub enum PublicKeyIdentity {
    /// An 8-byte public key token, stored as the `u64` whose little-endian byte
    /// order matches the displayed hex digits (e.g. `b77a5c561934e089`).
    Token(u64),
    /// A complete public key blob.
    FullKey(Vec<u8>),
}

impl PublicKeyIdentity {
    /// Returns the 8-byte public key token for this identity.
    ///
    /// For [`PublicKeyIdentity::Token`] this is the stored value; for
    /// [`PublicKeyIdentity::FullKey`] it is derived via SHA-1.
    #[must_use]
    pub fn token(&self) -> u64 {
        match self {
            PublicKeyIdentity::Token(token) => *token,
            PublicKeyIdentity::FullKey(key) => {
                let digest = Sha1::digest(key);

                // Token bytes are the trailing 8 digest bytes in reverse order;
                // the reversed sequence is the displayed byte order, which is the
                // little-endian layout of the stored u64.
                let mut bytes = [0u8; 8];
                for (i, byte) in digest[12..20].iter().rev().enumerate() {
                    bytes[i] = *byte;
                }
                u64::from_le_bytes(bytes)
            }
        }
    }

    /// Formats the token as the 16 lowercase hex digits used in display names.
    #[must_use]
    pub fn token_hex(&self) -> String {
        hex::encode(self.token().to_le_bytes())
    }
}

impl PartialEq for PublicKeyIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.token() == other.token()
    }
}

impl Eq for PublicKeyIdentity {}

impl std::hash::Hash for PublicKeyIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.token().hash(state);
    }
}

/// Content-type flag distinguishing ordinary assemblies from special
/// runtime-packaging types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AssemblyContentType {
    /// Ordinary managed assembly
    #[default]
    Default,
    /// Windows Runtime packaging
    WindowsRuntime,
}

impl AssemblyContentType {
    /// Decode the content-type byte stored in manifest identity records.
    ///
    /// # Errors
    /// Returns an error for unknown flag values.
    pub fn from_raw(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Default),
            1 => Ok(Self::WindowsRuntime),
            _ => Err(malformed_error!("Unknown assembly content type: {}", value)),
        }
    }

    /// Encode as the manifest content-type byte.
    #[must_use]
    pub fn to_raw(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::WindowsRuntime => 1,
        }
    }
}

/// Complete identity information for one assembly in the debuggee snapshot.
///
/// # Identity Components
///
/// - **Name**: simple assembly name (e.g., "mscorlib", "System.Core")
/// - **Version**: four-part version for compatibility decisions
/// - **Culture**: `None` for culture-neutral assemblies
/// - **Key**: strong-name key or token; `None` for weak-named assemblies
/// - **Content type**: ordinary vs. Windows Runtime packaging
///
/// Equality and hashing cover all five components; names compare
/// case-insensitively and keys compare by derived token (see module docs).
#[derive(Debug, Clone)]
pub struct AssemblyIdentity {
    /// Simple assembly name (e.g., "mscorlib", "System.Core")
    pub name: String,
    /// Four-part version number
    pub version: AssemblyVersion,
    /// Culture for localized satellite assemblies; `None` when culture-neutral
    pub culture: Option<String>,
    /// Strong-name key or token; `None` for weak-named assemblies
    pub key: Option<PublicKeyIdentity>,
    /// Packaging content type
    pub content_type: AssemblyContentType,
}

impl PartialEq for AssemblyIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.version == other.version
            && self.culture == other.culture
            && self.key == other.key
            && self.content_type == other.content_type
    }
}

impl Eq for AssemblyIdentity {}

impl std::hash::Hash for AssemblyIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
        self.version.hash(state);
        self.culture.hash(state);
        self.key.hash(state);
        self.content_type.hash(state);
    }
}

impl AssemblyIdentity {
    /// Create a new assembly identity with the specified components.
    pub fn new(
        name: impl Into<String>,
        version: AssemblyVersion,
        culture: Option<String>,
        key: Option<PublicKeyIdentity>,
        content_type: AssemblyContentType,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            culture,
            key,
            content_type,
        }
    }

    /// Create a weak-named, culture-neutral identity - the common case in tests
    /// and for dynamically emitted debuggee modules.
    pub fn simple(name: impl Into<String>, version: AssemblyVersion) -> Self {
        Self::new(name, version, None, None, AssemblyContentType::Default)
    }

    /// The well-known query-support library identity (`System.Core`).
    ///
    /// Used as the fallback missing identity when a diagnostic indicates
    /// LINQ-style query support is required without naming an assembly.
    #[must_use]
    pub fn query_support_library() -> Self {
        Self::new(
            "System.Core",
            AssemblyVersion::new(4, 0, 0, 0),
            None,
            Some(PublicKeyIdentity::Token(u64::from_le_bytes([
                0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89,
            ]))),
            AssemblyContentType::Default,
        )
    }

    /// The well-known dynamic-call-support library identity (`Microsoft.CSharp`).
    ///
    /// Used as the fallback missing identity when a diagnostic indicates dynamic
    /// dispatch support is required without naming an assembly.
    #[must_use]
    pub fn dynamic_support_library() -> Self {
        Self::new(
            "Microsoft.CSharp",
            AssemblyVersion::new(4, 0, 0, 0),
            None,
            Some(PublicKeyIdentity::Token(u64::from_le_bytes([
                0xb0, 0x3f, 0x5f, 0x7f, 0x11, 0xd5, 0x0a, 0x3a,
            ]))),
            AssemblyContentType::Default,
        )
    }

    /// Check if this assembly is strong-named.
    #[must_use]
    pub fn is_strong_named(&self) -> bool {
        self.key.is_some()
    }

    /// Check if this assembly's simple name is one of the core library names.
    #[must_use]
    pub fn is_core_library(&self) -> bool {
        CORE_LIBRARY_NAMES
            .iter()
            .any(|n| n.eq_ignore_ascii_case(&self.name))
    }

    /// Check whether two identities share a simple name (case-insensitive).
    #[must_use]
    pub fn has_same_simple_name(&self, other: &AssemblyIdentity) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }

    /// Check if this assembly identity can satisfy a reference to `required`.
    ///
    /// Name and culture must match; version must be compatible per
    /// [`AssemblyVersion::is_compatible_with`]; when the requirement is
    /// strong-named the tokens must agree.
    #[must_use]
    pub fn satisfies(&self, required: &AssemblyIdentity) -> bool {
        if !self.has_same_simple_name(required) {
            return false;
        }

        if self.culture != required.culture {
            return false;
        }

        if let Some(required_key) = &required.key {
            match &self.key {
                Some(key) if key == required_key => {}
                _ => return false,
            }
        }

        self.version.is_compatible_with(&required.version)
    }

    /// Generate the display name string for this assembly identity.
    ///
    /// Produces the standard
    /// `Name, Version=a.b.c.d, Culture=neutral, PublicKeyToken=...` format the
    /// debugger shows in missing-assembly diagnostics.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 80);

        result.push_str(&self.name);
        let _ = write!(result, ", Version={}", self.version);

        let culture_str = self.culture.as_deref().unwrap_or("neutral");
        let _ = write!(result, ", Culture={}", culture_str);

        result.push_str(", PublicKeyToken=");
        match &self.key {
            Some(key) => result.push_str(&key.token_hex()),
            None => result.push_str("null"),
        }

        if self.content_type == AssemblyContentType::WindowsRuntime {
            result.push_str(", ContentType=WindowsRuntime");
        }

        result
    }

    /// Parse an assembly identity from a display name string.
    ///
    /// Accepts simple names and fully-qualified names with `Version=`,
    /// `Culture=`, `PublicKeyToken=` and `ContentType=` components in any order.
    ///
    /// # Errors
    /// Returns an error if the display name cannot be parsed.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut version = AssemblyVersion::UNKNOWN;
        let mut culture = None;
        let mut key = None;
        let mut content_type = AssemblyContentType::Default;

        let parts: Vec<&str> = display_name.split(',').map(str::trim).collect();

        let name = parts[0].trim().to_string();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        for part in parts.iter().skip(1) {
            if let Some(value) = part.strip_prefix("Version=") {
                version = AssemblyVersion::parse(value)?;
            } else if let Some(value) = part.strip_prefix("Culture=") {
                if value != "neutral" {
                    culture = Some(value.to_string());
                }
            } else if let Some(value) = part.strip_prefix("PublicKeyToken=") {
                if value != "null" && !value.is_empty() {
                    let token_bytes = hex::decode(value).map_err(|e| {
                        malformed_error!("Invalid hex in PublicKeyToken '{}': {}", value, e)
                    })?;

                    if token_bytes.len() != 8 {
                        return Err(malformed_error!(
                            "PublicKeyToken must be exactly 8 bytes (16 hex characters), got {} bytes from '{}'",
                            token_bytes.len(),
                            value
                        ));
                    }

                    let mut token_array = [0u8; 8];
                    token_array.copy_from_slice(&token_bytes);
                    key = Some(PublicKeyIdentity::Token(u64::from_le_bytes(token_array)));
                }
            } else if let Some(value) = part.strip_prefix("ContentType=") {
                if value.eq_ignore_ascii_case("WindowsRuntime") {
                    content_type = AssemblyContentType::WindowsRuntime;
                }
            }
        }

        Ok(Self {
            name,
            version,
            culture,
            key,
            content_type,
        })
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for AssemblyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
