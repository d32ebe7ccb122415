use crate::codec::{Reader, Writer};
use crate::Error;

/// ClientKeyExchange.
///
/// The body layout depends on the key exchange of the negotiated suite, which
/// the message alone does not tell. The raw body is kept and read through
/// [`ClientKeyExchange::encrypted_pre_master_secret`] or
/// [`ClientKeyExchange::ecdh_public`] once the suite is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKeyExchange {
    pub body: Vec<u8>,
}

impl ClientKeyExchange {
    /// RSA: `opaque EncryptedPreMasterSecret<0..2^16-1>`.
    pub fn rsa(encrypted: &[u8]) -> Self {
        let mut body = Vec::with_capacity(2 + encrypted.len());
        body.extend_from_slice(&(encrypted.len() as u16).to_be_bytes());
        body.extend_from_slice(encrypted);
        ClientKeyExchange { body }
    }

    /// ECDHE: `opaque point<1..2^8-1>`.
    pub fn ecdhe(public: &[u8]) -> Self {
        let mut body = Vec::with_capacity(1 + public.len());
        body.push(public.len() as u8);
        body.extend_from_slice(public);
        ClientKeyExchange { body }
    }

    pub fn encrypted_pre_master_secret(&self) -> Result<&[u8], Error> {
        let mut r = Reader::new(&self.body);
        let encrypted = r.read_vec_u16()?;
        r.expect_end("ClientKeyExchange")?;
        Ok(encrypted)
    }

    pub fn ecdh_public(&self) -> Result<&[u8], Error> {
        let mut r = Reader::new(&self.body);
        let public = r.read_vec_u8()?;
        r.expect_end("ClientKeyExchange")?;
        if public.is_empty() {
            return Err(Error::MalformedMessage("empty ECDH public key".into()));
        }
        Ok(public)
    }

    pub fn parse(r: &mut Reader<'_>) -> Result<ClientKeyExchange, Error> {
        let body = r.read_bytes(r.remaining())?.to_vec();
        Ok(ClientKeyExchange { body })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        w.put_bytes(&self.body);
    }
}
