use crate::codec::{Reader, Writer};
use crate::Error;

/// Finished. 12 bytes of verify data in TLS 1.2, the hash length in TLS 1.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub verify_data: Vec<u8>,
}

impl Finished {
    pub fn parse(r: &mut Reader<'_>) -> Result<Finished, Error> {
        let verify_data = r.read_bytes(r.remaining())?.to_vec();
        if verify_data.is_empty() {
            return Err(Error::MalformedMessage("empty Finished".into()));
        }
        Ok(Finished { verify_data })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        w.put_bytes(&self.verify_data);
    }
}
