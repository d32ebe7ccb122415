//! SHA-2 transcript hashing.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};

use sha2::{Digest, Sha256, Sha384};

use crate::buffer::Buf;
use crate::crypto::provider::{HashContext, HashProvider};
use crate::types::HashAlgorithm;

/// A running digest. Finalizing works on a copy so the transcript can keep
/// growing after an intermediate hash was taken.
#[derive(Debug, Clone)]
struct Running<D>(D);

impl<D> HashContext for Running<D>
where
    D: Digest + Clone + Send + Sync + Debug + UnwindSafe + RefUnwindSafe,
{
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn clone_and_finalize(&self, out: &mut Buf) {
        out.clear();
        out.extend_from_slice(&self.0.clone().finalize());
    }
}

#[derive(Debug)]
pub(super) struct RustCryptoHashProvider;

impl HashProvider for RustCryptoHashProvider {
    fn create_hash(&self, algorithm: HashAlgorithm) -> Box<dyn HashContext> {
        match algorithm {
            HashAlgorithm::SHA256 => Box::new(Running(Sha256::new())),
            HashAlgorithm::SHA384 => Box::new(Running(Sha384::new())),
        }
    }
}

pub(super) static HASH_PROVIDER: RustCryptoHashProvider = RustCryptoHashProvider;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intermediate_hash_does_not_end_the_transcript() {
        let mut ctx = HASH_PROVIDER.create_hash(HashAlgorithm::SHA256);
        let mut out = Buf::new();

        ctx.update(b"abc");
        ctx.clone_and_finalize(&mut out);
        assert_eq!(&out[..], &Sha256::digest(b"abc")[..]);

        ctx.update(b"def");
        ctx.clone_and_finalize(&mut out);
        assert_eq!(&out[..], &Sha256::digest(b"abcdef")[..]);
    }

    #[test]
    fn sha384_output_length() {
        let mut ctx = HASH_PROVIDER.create_hash(HashAlgorithm::SHA384);
        ctx.update(b"transcript");
        let mut out = Buf::new();
        ctx.clone_and_finalize(&mut out);
        assert_eq!(out.len(), 48);
        assert_eq!(&out[..], &Sha384::digest(b"transcript")[..]);
    }
}
