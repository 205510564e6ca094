//! Shared fixtures for integration tests: a module-manifest builder and a
//! scripted expression front end.

#![allow(dead_code)]

use dotprobe::prelude::*;

/// Builder producing module-manifest bytes for tests.
///
/// The MVID defaults to the first 16 bytes of the assembly name, zero-padded.
pub struct ModuleBuilder {
    mvid: [u8; 16],
    identity: AssemblyIdentity,
    refs: Vec<AssemblyIdentity>,
    types: Vec<(String, String, u32)>,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> Self {
        let mut mvid = [0u8; 16];
        for (i, byte) in name.as_bytes().iter().take(16).enumerate() {
            mvid[i] = *byte;
        }

        ModuleBuilder {
            mvid,
            identity: AssemblyIdentity::simple(name, AssemblyVersion::new(1, 0, 0, 0)),
            refs: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn mvid(mut self, mvid: [u8; 16]) -> Self {
        self.mvid = mvid;
        self
    }

    pub fn version(mut self, major: u16, minor: u16, build: u16, revision: u16) -> Self {
        self.identity.version = AssemblyVersion::new(major, minor, build, revision);
        self
    }

    pub fn key_token(mut self, token: u64) -> Self {
        self.identity.key = Some(PublicKeyIdentity::Token(token));
        self
    }

    pub fn reference(mut self, identity: &AssemblyIdentity) -> Self {
        self.refs.push(identity.clone());
        self
    }

    pub fn type_def(mut self, namespace: &str, name: &str, token: u32) -> Self {
        self.types
            .push((namespace.to_string(), name.to_string(), token));
        self
    }

    pub fn identity(&self) -> AssemblyIdentity {
        self.identity.clone()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"DPMB");
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&self.mvid);
        write_identity(&mut buf, &self.identity);

        buf.extend_from_slice(&(self.refs.len() as u32).to_le_bytes());
        for r in &self.refs {
            write_identity(&mut buf, r);
        }

        buf.extend_from_slice(&(self.types.len() as u32).to_le_bytes());
        for (namespace, name, token) in &self.types {
            buf.extend_from_slice(&token.to_le_bytes());
            write_utf8(&mut buf, namespace);
            write_utf8(&mut buf, name);
        }

        buf
    }

    pub fn build(&self) -> MetadataBlock {
        MetadataBlock::parse(self.to_bytes()).expect("test manifest must parse")
    }
}

fn write_7bit(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

fn write_utf16(buf: &mut Vec<u8>, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    write_7bit(buf, (units.len() * 2) as u32);
    for unit in units {
        buf.extend_from_slice(&unit.to_le_bytes());
    }
}

fn write_utf8(buf: &mut Vec<u8>, s: &str) {
    write_7bit(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

fn write_identity(buf: &mut Vec<u8>, identity: &AssemblyIdentity) {
    write_utf16(buf, &identity.name);
    buf.extend_from_slice(&identity.version.major.to_le_bytes());
    buf.extend_from_slice(&identity.version.minor.to_le_bytes());
    buf.extend_from_slice(&identity.version.build.to_le_bytes());
    buf.extend_from_slice(&identity.version.revision.to_le_bytes());
    write_utf16(buf, identity.culture.as_deref().unwrap_or(""));

    match &identity.key {
        None => buf.push(0),
        Some(PublicKeyIdentity::Token(token)) => {
            buf.push(1);
            buf.extend_from_slice(&token.to_le_bytes());
        }
        Some(PublicKeyIdentity::FullKey(key)) => {
            buf.push(2);
            write_7bit(buf, key.len() as u32);
            buf.extend_from_slice(key);
        }
    }

    buf.push(identity.content_type.to_raw());
}

/// Front end that binds an expression iff every required type resolves in the
/// unit's symbol universe. Unresolvable types are reported as
/// missing-assembly diagnostics naming the expected defining assembly;
/// ambiguities surface as ambiguous-type diagnostics.
pub struct ScriptedFrontend {
    requirements: Vec<(String, String, AssemblyIdentity)>,
}

impl ScriptedFrontend {
    /// Each requirement is `(namespace, type name, expected defining assembly)`.
    pub fn requiring(requirements: &[(&str, &str, &str)]) -> Self {
        Self {
            requirements: requirements
                .iter()
                .map(|(ns, name, asm)| {
                    (
                        (*ns).to_string(),
                        (*name).to_string(),
                        AssemblyIdentity::simple(*asm, AssemblyVersion::new(1, 0, 0, 0)),
                    )
                })
                .collect(),
        }
    }
}

impl ExpressionFrontend for ScriptedFrontend {
    fn compile_expression(
        &self,
        unit: &CompilationUnit,
        expression: &str,
        _flags: EvaluationFlags,
        _aliases: &[Alias],
    ) -> std::result::Result<CompiledArtifact, Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();
        for (namespace, name, assembly) in &self.requirements {
            match unit.universe().find_type(namespace, name) {
                Ok(Some(_)) => {}
                Ok(None) => diagnostics.push(Diagnostic::missing_assembly(
                    DiagnosticKind::TypeNotReferenced,
                    format!("The type '{namespace}.{name}' is not referenced"),
                    assembly.clone(),
                )),
                Err(Error::AmbiguousType {
                    name,
                    first,
                    second,
                }) => diagnostics.push(Diagnostic::ambiguous_type(name, first, second)),
                Err(other) => diagnostics.push(Diagnostic::error(
                    DiagnosticKind::Internal,
                    other.to_string(),
                )),
            }
        }

        if diagnostics.is_empty() {
            Ok(CompiledArtifact {
                assembly_bytes: expression.as_bytes().to_vec(),
                type_name: unit.universe().host_type_name().to_string(),
                entry_method: "<>m0".to_string(),
                result_properties: ResultProperties::default(),
            })
        } else {
            Err(diagnostics)
        }
    }
}

/// Initialize test logging once per binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
