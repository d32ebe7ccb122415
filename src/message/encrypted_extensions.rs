use crate::codec::{Reader, Writer};
use crate::Error;

use super::extensions::Extension;

/// EncryptedExtensions (RFC 8446 Section 4.3.1). Unlike a hello, the block is
/// always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncryptedExtensions {
    pub extensions: Vec<Extension>,
}

impl EncryptedExtensions {
    pub fn parse(r: &mut Reader<'_>) -> Result<EncryptedExtensions, Error> {
        let mut block = Reader::new(r.read_vec_u16()?);
        r.expect_end("EncryptedExtensions")?;
        let mut extensions = Vec::new();
        while !block.is_empty() {
            extensions.push(Extension::parse(&mut block)?);
        }
        Ok(EncryptedExtensions { extensions })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        w.put_vec_u16(|w| {
            for ext in &self.extensions {
                ext.serialize(w);
            }
        });
    }
}
