//! Hello extensions.
//!
//! Extensions are kept as raw `(type, data)` pairs after the hello is parsed.
//! The typed views in the submodules decode the few the engine acts on.

mod key_share;
mod server_name;
mod signature_algorithms;
mod supported_groups;
mod supported_versions;

pub use key_share::{KeyShareClientHello, KeyShareEntry, KeyShareHelloRetryRequest};
pub use key_share::KeyShareServerHello;
pub use server_name::ServerNameExtension;
pub use signature_algorithms::SignatureAlgorithmsExtension;
pub use supported_groups::SupportedGroupsExtension;
pub use supported_versions::{SupportedVersionsClientHello, SupportedVersionsServerHello};

use std::collections::HashSet;

use crate::codec::{Reader, Writer};
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub extension_type: ExtensionType,
    pub extension_data: Vec<u8>,
}

impl Extension {
    pub fn new(extension_type: ExtensionType, extension_data: Vec<u8>) -> Self {
        Extension {
            extension_type,
            extension_data,
        }
    }

    /// Extension with no body, e.g. `extended_master_secret`.
    pub fn empty(extension_type: ExtensionType) -> Self {
        Extension::new(extension_type, Vec::new())
    }

    /// `renegotiation_info` for an initial handshake: an empty
    /// `renegotiated_connection` (RFC 5746 Section 3.6).
    pub fn empty_renegotiation_info() -> Self {
        Extension::new(ExtensionType::RenegotiationInfo, vec![0])
    }

    /// `ec_point_formats` advertising only uncompressed points (RFC 8422).
    pub fn uncompressed_point_format() -> Self {
        Extension::new(ExtensionType::EcPointFormats, vec![1, 0])
    }

    pub fn parse(r: &mut Reader<'_>) -> Result<Extension, Error> {
        let extension_type = ExtensionType::from_u16(r.read_u16()?);
        let extension_data = r.read_vec_u16()?.to_vec();
        Ok(Extension {
            extension_type,
            extension_data,
        })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        w.put_u16(self.extension_type.as_u16());
        w.put_vec_u16(|w| w.put_bytes(&self.extension_data));
    }
}

/// Parse the optional trailing extension block of a hello.
///
/// An absent block is an empty list. A type that appears twice is an
/// `illegal_parameter` error.
pub fn parse_extensions(r: &mut Reader<'_>) -> Result<Vec<Extension>, Error> {
    let mut extensions: Vec<Extension> = Vec::new();
    if r.is_empty() {
        return Ok(extensions);
    }

    let mut seen = HashSet::new();
    let mut block = Reader::new(r.read_vec_u16()?);
    while !block.is_empty() {
        let ext = Extension::parse(&mut block)?;
        if !seen.insert(ext.extension_type.as_u16()) {
            return Err(Error::IllegalParameter(format!(
                "duplicate extension {:?}",
                ext.extension_type
            )));
        }
        extensions.push(ext);
    }

    Ok(extensions)
}

/// Write an extension block. Nothing is written for an empty list.
pub fn serialize_extensions(extensions: &[Extension], w: &mut Writer<'_>) {
    if extensions.is_empty() {
        return;
    }
    w.put_vec_u16(|w| {
        for ext in extensions {
            ext.serialize(w);
        }
    });
}

/// Find an extension by type.
pub fn find_extension(extensions: &[Extension], typ: ExtensionType) -> Option<&[u8]> {
    extensions
        .iter()
        .find(|e| e.extension_type == typ)
        .map(|e| &e.extension_data[..])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionType {
    ServerName,
    SupportedGroups,
    EcPointFormats,
    SignatureAlgorithms,
    ApplicationLayerProtocolNegotiation,
    EncryptThenMac,
    ExtendedMasterSecret,
    SessionTicket,
    PreSharedKey,
    EarlyData,
    SupportedVersions,
    Cookie,
    PskKeyExchangeModes,
    KeyShare,
    RenegotiationInfo,
    Unknown(u16),
}

impl ExtensionType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => ExtensionType::ServerName,
            0x000A => ExtensionType::SupportedGroups,
            0x000B => ExtensionType::EcPointFormats,
            0x000D => ExtensionType::SignatureAlgorithms,
            0x0010 => ExtensionType::ApplicationLayerProtocolNegotiation,
            0x0016 => ExtensionType::EncryptThenMac,
            0x0017 => ExtensionType::ExtendedMasterSecret,
            0x0023 => ExtensionType::SessionTicket,
            0x0029 => ExtensionType::PreSharedKey,
            0x002A => ExtensionType::EarlyData,
            0x002B => ExtensionType::SupportedVersions,
            0x002C => ExtensionType::Cookie,
            0x002D => ExtensionType::PskKeyExchangeModes,
            0x0033 => ExtensionType::KeyShare,
            0xFF01 => ExtensionType::RenegotiationInfo,
            _ => ExtensionType::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ExtensionType::ServerName => 0x0000,
            ExtensionType::SupportedGroups => 0x000A,
            ExtensionType::EcPointFormats => 0x000B,
            ExtensionType::SignatureAlgorithms => 0x000D,
            ExtensionType::ApplicationLayerProtocolNegotiation => 0x0010,
            ExtensionType::EncryptThenMac => 0x0016,
            ExtensionType::ExtendedMasterSecret => 0x0017,
            ExtensionType::SessionTicket => 0x0023,
            ExtensionType::PreSharedKey => 0x0029,
            ExtensionType::EarlyData => 0x002A,
            ExtensionType::SupportedVersions => 0x002B,
            ExtensionType::Cookie => 0x002C,
            ExtensionType::PskKeyExchangeModes => 0x002D,
            ExtensionType::KeyShare => 0x0033,
            ExtensionType::RenegotiationInfo => 0xFF01,
            ExtensionType::Unknown(value) => *value,
        }
    }
}
