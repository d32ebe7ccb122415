//! SignatureAlgorithms extension (RFC 8446 Section 4.2.3, RFC 5246 Section 7.4.1.4.1)

use crate::buffer::Buf;
use crate::codec::{Reader, Writer};
use crate::types::SignatureScheme;
use crate::Error;

use super::{Extension, ExtensionType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureAlgorithmsExtension {
    pub schemes: Vec<SignatureScheme>,
}

impl SignatureAlgorithmsExtension {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let list = r.read_vec_u16()?;
        r.expect_end("signature_algorithms")?;
        if list.is_empty() || list.len() % 2 != 0 {
            return Err(Error::MalformedMessage(
                "bad signature_algorithms length".into(),
            ));
        }
        let mut list = Reader::new(list);
        let mut schemes = Vec::with_capacity(list.remaining() / 2);
        while !list.is_empty() {
            schemes.push(SignatureScheme::from_u16(list.read_u16()?));
        }
        Ok(SignatureAlgorithmsExtension { schemes })
    }

    pub fn to_extension(&self) -> Extension {
        let mut buf = Buf::new();
        let mut w = Writer::new(&mut buf);
        w.put_vec_u16(|w| {
            for s in &self.schemes {
                w.put_u16(s.as_u16());
            }
        });
        Extension::new(ExtensionType::SignatureAlgorithms, buf.into_vec())
    }
}
