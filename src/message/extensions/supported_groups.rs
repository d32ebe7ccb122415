//! SupportedGroups extension (RFC 8446 Section 4.2.7, RFC 8422 Section 5.1.1)

use crate::buffer::Buf;
use crate::codec::{Reader, Writer};
use crate::types::NamedGroup;
use crate::Error;

use super::{Extension, ExtensionType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedGroupsExtension {
    pub groups: Vec<NamedGroup>,
}

impl SupportedGroupsExtension {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let list = r.read_vec_u16()?;
        r.expect_end("supported_groups")?;
        if list.len() % 2 != 0 {
            return Err(Error::MalformedMessage("odd supported_groups length".into()));
        }
        let mut list = Reader::new(list);
        let mut groups = Vec::with_capacity(list.remaining() / 2);
        while !list.is_empty() {
            groups.push(NamedGroup::from_u16(list.read_u16()?));
        }
        Ok(SupportedGroupsExtension { groups })
    }

    pub fn to_extension(&self) -> Extension {
        let mut buf = Buf::new();
        let mut w = Writer::new(&mut buf);
        w.put_vec_u16(|w| {
            for g in &self.groups {
                w.put_u16(g.as_u16());
            }
        });
        Extension::new(ExtensionType::SupportedGroups, buf.into_vec())
    }
}
