//! Factories for crafting module manifests in unit tests.

use crate::metadata::{
    block::MetadataBlock,
    identity::{AssemblyContentType, AssemblyIdentity, AssemblyVersion, PublicKeyIdentity},
};

/// Builder producing module-manifest bytes (and parsed blocks) for tests.
///
/// The MVID defaults to the first 16 bytes of the assembly name, zero-padded,
/// which keeps identical builders deterministic while distinct names yield
/// distinct modules.
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

    pub fn culture(mut self, culture: &str) -> Self {
        self.identity.culture = Some(culture.to_string());
        self
    }

    pub fn key_token(mut self, token: u64) -> Self {
        self.identity.key = Some(PublicKeyIdentity::Token(token));
        self
    }

    pub fn full_key(mut self, key: Vec<u8>) -> Self {
        self.identity.key = Some(PublicKeyIdentity::FullKey(key));
        self
    }

    pub fn content_type(mut self, content_type: AssemblyContentType) -> Self {
        self.identity.content_type = content_type;
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
        MetadataBlock::parse(self.to_bytes()).expect("factory-built manifest must parse")
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
