//! Byte buffers used by the record layer and the key schedules.
//!
//! [`Buf`] wraps `Vec<u8>` and plugs into the RustCrypto `aead::Buffer` trait so
//! AEAD ciphers can seal and open records in place. Secrets derived by the key
//! schedules are also held in a `Buf` and wiped with [`Buf::zeroize`] once they
//! are replaced.

use std::fmt;
use std::ops::{Deref, DerefMut};

use zeroize::Zeroize;

/// Growable byte buffer.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Buf(Vec<u8>);

impl Buf {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `cap` bytes.
    pub fn with_capacity(cap: usize) -> Self {
        Buf(Vec::with_capacity(cap))
    }

    /// Create a new buffer from a slice.
    pub fn from_slice(data: &[u8]) -> Self {
        Buf(data.to_vec())
    }

    /// Clear the buffer, keeping the allocation.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Append a slice.
    pub fn extend_from_slice(&mut self, other: &[u8]) {
        self.0.extend_from_slice(other);
    }

    /// Append a single byte.
    pub fn push(&mut self, byte: u8) {
        self.0.push(byte);
    }

    /// Resize to `len`, filling new bytes with `value`.
    pub fn resize(&mut self, len: usize, value: u8) {
        self.0.resize(len, value);
    }

    /// Shorten the buffer. No effect if `len` exceeds the current length.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Overwrite the contents with zeros and empty the buffer.
    pub fn zeroize(&mut self) {
        self.0.zeroize();
    }

    /// Convert into the underlying `Vec<u8>`.
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

impl Deref for Buf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Buf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl AsRef<[u8]> for Buf {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Buf {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<Vec<u8>> for Buf {
    fn from(v: Vec<u8>) -> Self {
        Buf(v)
    }
}

impl From<&[u8]> for Buf {
    fn from(v: &[u8]) -> Self {
        Buf(v.to_vec())
    }
}

impl fmt::Debug for Buf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Contents are frequently key material.
        f.debug_struct("Buf").field("len", &self.0.len()).finish()
    }
}

/// Borrowed window over a record payload for in-place decryption.
///
/// The AEAD opens the ciphertext and shortens the window by the tag length,
/// without copying the payload out of the receive buffer.
#[allow(clippy::len_without_is_empty)]
pub struct TmpBuf<'a>(&'a mut [u8], usize);

impl<'a> TmpBuf<'a> {
    /// Wrap a mutable slice. The initial length is the whole slice.
    pub fn new(buf: &'a mut [u8]) -> Self {
        let len = buf.len();
        Self(buf, len)
    }

    /// Current length of the window.
    pub fn len(&self) -> usize {
        self.1
    }

    /// Shrink the window.
    pub fn truncate(&mut self, len: usize) {
        if len <= self.1 {
            self.1 = len;
        }
    }
}

impl<'a> AsRef<[u8]> for TmpBuf<'a> {
    fn as_ref(&self) -> &[u8] {
        &self.0[..self.1]
    }
}

impl<'a> AsMut<[u8]> for TmpBuf<'a> {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0[..self.1]
    }
}

impl<'a> aes_gcm::aead::Buffer for TmpBuf<'a> {
    fn extend_from_slice(&mut self, other: &[u8]) -> Result<(), aes_gcm::aead::Error> {
        let available = self.0.len() - self.1;
        if available < other.len() {
            return Err(aes_gcm::aead::Error);
        }
        self.0[self.1..self.1 + other.len()].copy_from_slice(other);
        self.1 += other.len();
        Ok(())
    }

    fn truncate(&mut self, len: usize) {
        TmpBuf::truncate(self, len);
    }
}

impl aes_gcm::aead::Buffer for Buf {
    fn extend_from_slice(&mut self, other: &[u8]) -> Result<(), aes_gcm::aead::Error> {
        self.0.extend_from_slice(other);
        Ok(())
    }

    fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }
}
