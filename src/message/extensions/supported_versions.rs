//! SupportedVersions extension (RFC 8446 Section 4.2.1)
//!
//! In TLS 1.3, version negotiation happens via this extension rather than
//! the legacy version field. The client sends a list of supported versions,
//! and the server responds with a single selected version.

use crate::buffer::Buf;
use crate::codec::{Reader, Writer};
use crate::types::ProtocolVersion;
use crate::Error;

use super::{Extension, ExtensionType};

/// SupportedVersions extension for ClientHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedVersionsClientHello {
    pub versions: Vec<ProtocolVersion>,
}

impl SupportedVersionsClientHello {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let list = r.read_vec_u8()?;
        r.expect_end("supported_versions")?;
        if list.is_empty() || list.len() % 2 != 0 {
            return Err(Error::MalformedMessage(
                "bad supported_versions length".into(),
            ));
        }

        let mut list = Reader::new(list);
        let mut versions = Vec::with_capacity(list.remaining() / 2);
        while !list.is_empty() {
            // GREASE and unknown values are kept as Unknown and never match.
            versions.push(ProtocolVersion::from_u16(list.read_u16()?));
        }
        Ok(SupportedVersionsClientHello { versions })
    }

    pub fn contains(&self, version: ProtocolVersion) -> bool {
        self.versions.contains(&version)
    }

    pub fn to_extension(&self) -> Extension {
        let mut buf = Buf::new();
        let mut w = Writer::new(&mut buf);
        w.put_vec_u8(|w| {
            for v in &self.versions {
                w.put_u16(v.as_u16());
            }
        });
        Extension::new(ExtensionType::SupportedVersions, buf.into_vec())
    }
}

/// SupportedVersions extension for ServerHello and HelloRetryRequest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedVersionsServerHello {
    pub selected_version: ProtocolVersion,
}

impl SupportedVersionsServerHello {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let selected_version = ProtocolVersion::from_u16(r.read_u16()?);
        r.expect_end("supported_versions")?;
        Ok(SupportedVersionsServerHello { selected_version })
    }

    pub fn to_extension(&self) -> Extension {
        let data = self.selected_version.as_u16().to_be_bytes().to_vec();
        Extension::new(ExtensionType::SupportedVersions, data)
    }
}
