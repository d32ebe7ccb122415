//! ServerName extension (RFC 6066 Section 3)
//!
//! Only the `host_name` entry is looked at. It is recorded on the connection
//! for the application; certificate selection is not driven by it.

use crate::buffer::Buf;
use crate::codec::{Reader, Writer};
use crate::Error;

use super::{Extension, ExtensionType};

const HOST_NAME: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNameExtension {
    pub host_name: Option<String>,
}

impl ServerNameExtension {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let mut list = Reader::new(r.read_vec_u16()?);
        r.expect_end("server_name")?;

        let mut host_name = None;
        while !list.is_empty() {
            let name_type = list.read_u8()?;
            let name = list.read_vec_u16()?;
            if name_type == HOST_NAME && host_name.is_none() {
                let name = std::str::from_utf8(name)
                    .map_err(|_| Error::MalformedMessage("server name not UTF-8".into()))?;
                host_name = Some(name.to_string());
            }
        }
        Ok(ServerNameExtension { host_name })
    }

    pub fn to_extension(&self) -> Extension {
        let mut buf = Buf::new();
        let mut w = Writer::new(&mut buf);
        if let Some(name) = &self.host_name {
            w.put_vec_u16(|w| {
                w.put_u8(HOST_NAME);
                w.put_vec_u16(|w| w.put_bytes(name.as_bytes()));
            });
        }
        Extension::new(ExtensionType::ServerName, buf.into_vec())
    }
}
