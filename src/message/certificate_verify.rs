use crate::codec::{Reader, Writer};
use crate::types::SignatureScheme;
use crate::Error;

/// Context string for a server CertificateVerify (RFC 8446 Section 4.4.3).
const SERVER_CONTEXT: &[u8] = b"TLS 1.3, server CertificateVerify";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateVerify {
    pub scheme: SignatureScheme,
    pub signature: Vec<u8>,
}

impl CertificateVerify {
    /// The content a TLS 1.3 server signs: 64 spaces, the context string, a
    /// zero byte and the transcript hash through Certificate.
    pub fn server_signed_content(transcript_hash: &[u8]) -> Vec<u8> {
        let mut content = Vec::with_capacity(64 + SERVER_CONTEXT.len() + 1 + transcript_hash.len());
        content.extend_from_slice(&[0x20; 64]);
        content.extend_from_slice(SERVER_CONTEXT);
        content.push(0);
        content.extend_from_slice(transcript_hash);
        content
    }

    pub fn parse(r: &mut Reader<'_>) -> Result<CertificateVerify, Error> {
        let scheme = SignatureScheme::from_u16(r.read_u16()?);
        let signature = r.read_vec_u16()?.to_vec();
        r.expect_end("CertificateVerify")?;
        Ok(CertificateVerify { scheme, signature })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        w.put_u16(self.scheme.as_u16());
        w.put_vec_u16(|w| w.put_bytes(&self.signature));
    }
}
