//! Handshake transcript.
//!
//! The transcript keeps the raw bytes of every handshake message in wire
//! order. The hash algorithm is only known once a cipher suite has been
//! chosen, so hashes are computed on demand over the stored bytes.

use crate::buffer::Buf;
use crate::crypto::CryptoProvider;
use crate::types::{HashAlgorithm, HandshakeType};

#[derive(Debug, Default)]
pub struct Transcript {
    bytes: Buf,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one complete handshake message, header included.
    pub fn append(&mut self, message: &[u8]) {
        self.bytes.extend_from_slice(message);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hash of everything appended so far.
    pub fn hash(&self, provider: &CryptoProvider, alg: HashAlgorithm) -> Buf {
        let mut out = Buf::new();
        provider.hash(alg, &self.bytes, &mut out);
        out
    }

    /// Replace the transcript with the synthetic `message_hash` message.
    ///
    /// RFC 8446 Section 4.4.1: after a HelloRetryRequest, ClientHello1 is
    /// replaced by `message_hash(254) || 00 00 Hash.length || Hash(ClientHello1)`.
    pub fn replace_with_message_hash(&mut self, provider: &CryptoProvider, alg: HashAlgorithm) {
        let digest = self.hash(provider, alg);
        self.bytes.clear();
        self.bytes.push(HandshakeType::MessageHash.as_u8());
        self.bytes.extend_from_slice(&[0, 0, digest.len() as u8]);
        self.bytes.extend_from_slice(&digest);
    }
}
