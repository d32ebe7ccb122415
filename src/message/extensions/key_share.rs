//! KeyShare extension (RFC 8446 Section 4.2.8)
//!
//! The ClientHello carries one entry per group the client pre-computed, the
//! ServerHello the single entry the server answers with, and a
//! HelloRetryRequest only the group the client should retry with.

use crate::buffer::Buf;
use crate::codec::{Reader, Writer};
use crate::types::NamedGroup;
use crate::Error;

use super::{Extension, ExtensionType};

/// A single key share entry: named group + public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShareEntry {
    pub group: NamedGroup,
    pub key_exchange: Vec<u8>,
}

impl KeyShareEntry {
    fn parse(r: &mut Reader<'_>) -> Result<Self, Error> {
        let group = NamedGroup::from_u16(r.read_u16()?);
        let key_exchange = r.read_vec_u16()?;
        if key_exchange.is_empty() {
            return Err(Error::MalformedMessage("empty key share".into()));
        }
        Ok(KeyShareEntry {
            group,
            key_exchange: key_exchange.to_vec(),
        })
    }

    fn serialize(&self, w: &mut Writer<'_>) {
        w.put_u16(self.group.as_u16());
        w.put_vec_u16(|w| w.put_bytes(&self.key_exchange));
    }
}

/// KeyShare extension for ClientHello.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyShareClientHello {
    pub entries: Vec<KeyShareEntry>,
}

impl KeyShareClientHello {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let mut list = Reader::new(r.read_vec_u16()?);
        r.expect_end("key_share")?;

        let mut entries: Vec<KeyShareEntry> = Vec::new();
        while !list.is_empty() {
            let entry = KeyShareEntry::parse(&mut list)?;
            // RFC 8446 Section 4.2.8: each group at most once.
            if entries.iter().any(|e| e.group == entry.group) {
                return Err(Error::IllegalParameter(format!(
                    "duplicate key share for {:?}",
                    entry.group
                )));
            }
            entries.push(entry);
        }
        Ok(KeyShareClientHello { entries })
    }

    /// Entry for `group`, if the client sent one.
    pub fn find(&self, group: NamedGroup) -> Option<&KeyShareEntry> {
        self.entries.iter().find(|e| e.group == group)
    }

    pub fn to_extension(&self) -> Extension {
        let mut buf = Buf::new();
        let mut w = Writer::new(&mut buf);
        w.put_vec_u16(|w| {
            for e in &self.entries {
                e.serialize(w);
            }
        });
        Extension::new(ExtensionType::KeyShare, buf.into_vec())
    }
}

/// KeyShare extension for ServerHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShareServerHello {
    pub entry: KeyShareEntry,
}

impl KeyShareServerHello {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let entry = KeyShareEntry::parse(&mut r)?;
        r.expect_end("key_share")?;
        Ok(KeyShareServerHello { entry })
    }

    pub fn to_extension(&self) -> Extension {
        let mut buf = Buf::new();
        self.entry.serialize(&mut Writer::new(&mut buf));
        Extension::new(ExtensionType::KeyShare, buf.into_vec())
    }
}

/// KeyShare extension for HelloRetryRequest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyShareHelloRetryRequest {
    pub selected_group: NamedGroup,
}

impl KeyShareHelloRetryRequest {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let selected_group = NamedGroup::from_u16(r.read_u16()?);
        r.expect_end("key_share")?;
        Ok(KeyShareHelloRetryRequest { selected_group })
    }

    pub fn to_extension(&self) -> Extension {
        let data = self.selected_group.as_u16().to_be_bytes().to_vec();
        Extension::new(ExtensionType::KeyShare, data)
    }
}
