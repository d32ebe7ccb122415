//! AEAD record formatting: nonces and additional data.
//!
//! These are kept apart from the provider abstraction. A provider's
//! [`Cipher`](super::Cipher) receives a ready nonce and AAD and never needs to
//! know which TLS version built them.

use std::ops::Deref;

use tinyvec::ArrayVec;

use crate::types::ContentType;

/// Explicit nonce carried in front of every TLS 1.2 AES-GCM record.
pub(crate) const GCM_EXPLICIT_NONCE_LEN: usize = 8;

/// Full 12 byte AEAD nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce(pub [u8; 12]);

impl Nonce {
    /// TLS 1.2 AES-GCM nonce (RFC 5288): 4 byte salt from the key block
    /// followed by the 8 byte explicit nonce from the record.
    pub(crate) fn tls12_gcm(salt: &[u8], explicit: &[u8]) -> Self {
        let mut nonce = [0u8; 12];
        nonce[..4].copy_from_slice(&salt[..4]);
        nonce[4..].copy_from_slice(&explicit[..GCM_EXPLICIT_NONCE_LEN]);
        Self(nonce)
    }

    /// Per RFC 8446 Section 5.3: nonce = iv XOR pad_left(seq, iv_len).
    ///
    /// Also used for TLS 1.2 ChaCha20-Poly1305 (RFC 7905).
    pub(crate) fn xor(iv: &[u8; 12], seq: u64) -> Self {
        let mut nonce = *iv;
        for (n, s) in nonce[4..].iter_mut().zip(seq.to_be_bytes()) {
            *n ^= s;
        }
        Self(nonce)
    }
}

impl Deref for Nonce {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Additional authenticated data for one record.
///
/// 13 bytes for TLS 1.2, the 5 byte record header for TLS 1.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aad(ArrayVec<[u8; 13]>);

impl Aad {
    /// `seq_num || type || version || length` (RFC 5246 Section 6.2.3.3).
    pub(crate) fn tls12(seq: u64, content_type: ContentType, length: u16) -> Self {
        let mut aad = ArrayVec::new();
        aad.extend_from_slice(&seq.to_be_bytes());
        aad.push(content_type.as_u8());
        aad.extend_from_slice(&[0x03, 0x03]);
        aad.extend_from_slice(&length.to_be_bytes());
        Aad(aad)
    }

    /// The TLS 1.3 record header: `opaque_type || legacy_version || length`.
    pub(crate) fn tls13(length: u16) -> Self {
        let mut aad = ArrayVec::new();
        aad.push(ContentType::ApplicationData.as_u8());
        aad.extend_from_slice(&[0x03, 0x03]);
        aad.extend_from_slice(&length.to_be_bytes());
        Aad(aad)
    }
}

impl Deref for Aad {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
