use crate::codec::{Reader, Writer};
use crate::types::{CipherSuite, NamedGroup, ProtocolVersion, SignatureScheme};
use crate::Error;

use super::extensions::{find_extension, parse_extensions, serialize_extensions};
use super::extensions::{Extension, ExtensionType, KeyShareClientHello, ServerNameExtension};
use super::extensions::{SignatureAlgorithmsExtension, SupportedGroupsExtension};
use super::extensions::SupportedVersionsClientHello;

/// Null compression, the only method TLS 1.2 and 1.3 allow.
pub const COMPRESSION_NULL: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub legacy_version: ProtocolVersion,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<Extension>,
}

impl ClientHello {
    pub fn parse(r: &mut Reader<'_>) -> Result<ClientHello, Error> {
        let legacy_version = ProtocolVersion::from_u16(r.read_u16()?);
        let random = r.read_array::<32>()?;

        let session_id = r.read_vec_u8()?;
        if session_id.len() > 32 {
            return Err(Error::MalformedMessage("session id longer than 32".into()));
        }

        let suites = r.read_vec_u16()?;
        if suites.is_empty() || suites.len() % 2 != 0 {
            return Err(Error::MalformedMessage("bad cipher_suites length".into()));
        }
        let mut suites = Reader::new(suites);
        let mut cipher_suites = Vec::with_capacity(suites.remaining() / 2);
        while !suites.is_empty() {
            cipher_suites.push(CipherSuite::from_u16(suites.read_u16()?));
        }

        let compression_methods = r.read_vec_u8()?.to_vec();
        if compression_methods.is_empty() {
            return Err(Error::MalformedMessage("no compression methods".into()));
        }

        let extensions = parse_extensions(r)?;
        r.expect_end("ClientHello")?;

        Ok(ClientHello {
            legacy_version,
            random,
            session_id: session_id.to_vec(),
            cipher_suites,
            compression_methods,
            extensions,
        })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        w.put_u16(self.legacy_version.as_u16());
        w.put_bytes(&self.random);
        w.put_vec_u8(|w| w.put_bytes(&self.session_id));
        w.put_vec_u16(|w| {
            for s in &self.cipher_suites {
                w.put_u16(s.as_u16());
            }
        });
        w.put_vec_u8(|w| w.put_bytes(&self.compression_methods));
        serialize_extensions(&self.extensions, w);
    }

    pub fn extension(&self, typ: ExtensionType) -> Option<&[u8]> {
        find_extension(&self.extensions, typ)
    }

    pub fn has_extension(&self, typ: ExtensionType) -> bool {
        self.extension(typ).is_some()
    }

    /// `supported_versions`, if present.
    pub fn supported_versions(&self) -> Result<Option<SupportedVersionsClientHello>, Error> {
        self.extension(ExtensionType::SupportedVersions)
            .map(SupportedVersionsClientHello::parse)
            .transpose()
    }

    /// Client key shares. Empty when the extension is absent.
    pub fn key_shares(&self) -> Result<KeyShareClientHello, Error> {
        Ok(self
            .extension(ExtensionType::KeyShare)
            .map(KeyShareClientHello::parse)
            .transpose()?
            .unwrap_or_default())
    }

    /// `supported_groups`, if present.
    pub fn supported_groups(&self) -> Result<Option<Vec<NamedGroup>>, Error> {
        Ok(self
            .extension(ExtensionType::SupportedGroups)
            .map(SupportedGroupsExtension::parse)
            .transpose()?
            .map(|e| e.groups))
    }

    /// `signature_algorithms`, if present.
    pub fn signature_schemes(&self) -> Result<Option<Vec<SignatureScheme>>, Error> {
        Ok(self
            .extension(ExtensionType::SignatureAlgorithms)
            .map(SignatureAlgorithmsExtension::parse)
            .transpose()?
            .map(|e| e.schemes))
    }

    /// The `host_name` from `server_name`, if any.
    pub fn server_name(&self) -> Result<Option<String>, Error> {
        Ok(self
            .extension(ExtensionType::ServerName)
            .map(ServerNameExtension::parse)
            .transpose()?
            .and_then(|e| e.host_name))
    }

    /// Whether the client signals secure renegotiation (RFC 5746), either by
    /// the SCSV or the extension.
    pub fn offers_secure_renegotiation(&self) -> bool {
        self.cipher_suites
            .contains(&CipherSuite::EMPTY_RENEGOTIATION_INFO_SCSV)
            || self.has_extension(ExtensionType::RenegotiationInfo)
    }
}
