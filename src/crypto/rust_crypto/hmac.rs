//! HMAC and the TLS 1.2 P_hash function using RustCrypto.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384};

use crate::buffer::Buf;
use crate::crypto::provider::HmacProvider;
use crate::types::HashAlgorithm;

/// HMAC over the concatenation of `parts`, written to `out`.
pub(super) fn hmac_parts(
    hash: HashAlgorithm,
    key: &[u8],
    parts: &[&[u8]],
    out: &mut Buf,
) -> Result<(), String> {
    out.clear();
    match hash {
        HashAlgorithm::SHA256 => {
            let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
                .map_err(|_| "Invalid HMAC key length".to_string())?;
            for p in parts {
                mac.update(p);
            }
            out.extend_from_slice(&mac.finalize().into_bytes());
        }
        HashAlgorithm::SHA384 => {
            let mut mac = <Hmac<Sha384> as Mac>::new_from_slice(key)
                .map_err(|_| "Invalid HMAC key length".to_string())?;
            for p in parts {
                mac.update(p);
            }
            out.extend_from_slice(&mac.finalize().into_bytes());
        }
    }
    Ok(())
}

/// Compute the TLS 1.2 P_hash expansion (RFC 5246 Section 5).
pub(super) fn p_hash(
    hash: HashAlgorithm,
    secret: &[u8],
    full_seed: &[u8],
    out: &mut Buf,
    output_len: usize,
) -> Result<(), String> {
    out.clear();

    // A(1) = HMAC_hash(secret, A(0)) where A(0) = seed
    let mut a = Buf::new();
    hmac_parts(hash, secret, &[full_seed], &mut a)?;

    let mut block = Buf::new();
    while out.len() < output_len {
        // HMAC_hash(secret, A(i) + seed)
        hmac_parts(hash, secret, &[&a[..], full_seed], &mut block)?;

        let to_copy = (output_len - out.len()).min(block.len());
        out.extend_from_slice(&block[..to_copy]);

        if out.len() < output_len {
            // A(i+1) = HMAC_hash(secret, A(i))
            let prev = std::mem::take(&mut a);
            hmac_parts(hash, secret, &[&prev[..]], &mut a)?;
        }
    }

    block.zeroize();
    a.zeroize();
    Ok(())
}

/// HMAC provider implementation.
#[derive(Debug)]
pub(super) struct RustCryptoHmacProvider;

impl HmacProvider for RustCryptoHmacProvider {
    fn hmac(
        &self,
        hash: HashAlgorithm,
        key: &[u8],
        data: &[&[u8]],
        out: &mut Buf,
    ) -> Result<(), String> {
        hmac_parts(hash, key, data, out)
    }
}

/// Static instance of the HMAC provider.
pub(super) static HMAC_PROVIDER: RustCryptoHmacProvider = RustCryptoHmacProvider;
