//! HKDF (RFC 5869) and the TLS 1.3 HKDF-Expand-Label on top of it.

use hkdf::Hkdf;
use sha2::{Sha256, Sha384};

use crate::buffer::Buf;
use crate::codec::Writer;
use crate::crypto::provider::HkdfProvider;
use crate::types::HashAlgorithm;

/// Expander keyed with a PRK, for either TLS 1.3 hash.
enum Expander {
    Sha256(Hkdf<Sha256>),
    Sha384(Hkdf<Sha384>),
}

impl Expander {
    fn new(hash: HashAlgorithm, prk: &[u8]) -> Result<Expander, String> {
        let expander = match hash {
            HashAlgorithm::SHA256 => Hkdf::<Sha256>::from_prk(prk).map(Expander::Sha256),
            HashAlgorithm::SHA384 => Hkdf::<Sha384>::from_prk(prk).map(Expander::Sha384),
        };
        expander.map_err(|_| format!("{} byte PRK too short for {:?}", prk.len(), hash))
    }

    fn expand(&self, info: &[u8], okm: &mut [u8]) -> Result<(), String> {
        match self {
            Expander::Sha256(h) => h.expand(info, okm),
            Expander::Sha384(h) => h.expand(info, okm),
        }
        .map_err(|_| format!("HKDF cannot produce {} bytes", okm.len()))
    }
}

#[derive(Debug)]
pub(super) struct RustCryptoHkdfProvider;

impl HkdfProvider for RustCryptoHkdfProvider {
    fn hkdf_extract(
        &self,
        hash: HashAlgorithm,
        salt: &[u8],
        ikm: &[u8],
        out: &mut Buf,
    ) -> Result<(), String> {
        // No salt means HashLen zero bytes.
        let salt = (!salt.is_empty()).then_some(salt);

        out.clear();
        match hash {
            HashAlgorithm::SHA256 => out.extend_from_slice(&Hkdf::<Sha256>::extract(salt, ikm).0),
            HashAlgorithm::SHA384 => out.extend_from_slice(&Hkdf::<Sha384>::extract(salt, ikm).0),
        }
        Ok(())
    }

    fn hkdf_expand(
        &self,
        hash: HashAlgorithm,
        prk: &[u8],
        info: &[u8],
        out: &mut Buf,
        output_len: usize,
    ) -> Result<(), String> {
        let expander = Expander::new(hash, prk)?;
        out.clear();
        out.resize(output_len, 0);
        expander.expand(info, out)
    }

    fn hkdf_expand_label(
        &self,
        hash: HashAlgorithm,
        secret: &[u8],
        label: &[u8],
        context: &[u8],
        out: &mut Buf,
        output_len: usize,
    ) -> Result<(), String> {
        // struct { uint16 length; opaque label<7..255>; opaque context<0..255>; } HkdfLabel
        let length = u16::try_from(output_len)
            .map_err(|_| format!("HkdfLabel length {} out of range", output_len))?;
        if b"tls13 ".len() + label.len() > 255 || context.len() > 255 {
            return Err("HkdfLabel label or context over 255 bytes".to_string());
        }

        let mut info = Buf::new();
        let mut w = Writer::new(&mut info);
        w.put_u16(length);
        w.put_vec_u8(|w| {
            w.put_bytes(b"tls13 ");
            w.put_bytes(label);
        });
        w.put_vec_u8(|w| w.put_bytes(context));

        self.hkdf_expand(hash, secret, &info, out, output_len)
    }
}

pub(super) static HKDF_PROVIDER: RustCryptoHkdfProvider = RustCryptoHkdfProvider;
