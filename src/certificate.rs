//! Certificate assembly and the server identity.
//!
//! The engine treats certificates as opaque DER. They are decoded once at
//! startup to make sure every section is a well formed X.509 certificate and
//! that the leaf matches the private key. After that the chain is only ever
//! copied into Certificate handshake messages.

use std::fmt;
use std::sync::Arc;

use der::Decode;
use log::debug;
use spki::ObjectIdentifier;
use x509_cert::Certificate as X509Certificate;

use crate::buffer::Buf;
use crate::codec::{Reader, Writer};
use crate::crypto::SigningKey;
use crate::types::{ProtocolVersion, SignatureAlgorithm};
use crate::{Config, Error};

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// Split a PEM document into its `(label, der)` sections.
fn pem_sections(pem: &str) -> Result<Vec<(String, Vec<u8>)>, Error> {
    let mut out = Vec::new();
    let mut rest = pem;

    while let Some(begin) = rest.find("-----BEGIN ") {
        let section = &rest[begin..];
        let end = section
            .find("-----END ")
            .ok_or_else(|| Error::InvalidCertificateData("unterminated PEM section".into()))?;
        // Closing dashes of the END line.
        let close = section[end + 9..]
            .find("-----")
            .map(|i| end + 9 + i + 5)
            .ok_or_else(|| Error::InvalidCertificateData("unterminated PEM section".into()))?;

        let (label, der) = pem_rfc7468::decode_vec(section[..close].as_bytes())
            .map_err(|e| Error::InvalidCertificateData(format!("bad PEM: {}", e)))?;
        out.push((label.to_string(), der));

        rest = &section[close..];
    }

    Ok(out)
}

/// Decode every `CERTIFICATE` section of a PEM document into DER.
///
/// The first certificate is the leaf. Sections with other labels are ignored.
/// Fails with [`Error::InvalidCertificateData`] when there is no certificate or
/// any certificate does not parse as X.509.
pub fn parse_pem_chain(pem: &str) -> Result<Vec<Vec<u8>>, Error> {
    let mut chain = Vec::new();

    for (label, der) in pem_sections(pem)? {
        if label != "CERTIFICATE" {
            debug!("Skipping PEM section {}", label);
            continue;
        }
        let cert = X509Certificate::from_der(&der)
            .map_err(|e| Error::InvalidCertificateData(format!("bad certificate: {}", e)))?;
        debug!(
            "Certificate {}: subject {}, signature algorithm {}",
            chain.len(),
            cert.tbs_certificate.subject,
            cert.signature_algorithm.oid
        );
        chain.push(der);
    }

    if chain.is_empty() {
        return Err(Error::InvalidCertificateData(
            "no CERTIFICATE section found".into(),
        ));
    }

    Ok(chain)
}

/// Serialize the body of a Certificate handshake message.
///
/// ```text
/// TLS 1.2:  opaque ASN.1Cert<1..2^24-1>;
///           ASN.1Cert certificate_list<0..2^24-1>;
///
/// TLS 1.3:  opaque certificate_request_context<0..2^8-1>;
///           CertificateEntry certificate_list<0..2^24-1>;
///           (each entry: cert_data<1..2^24-1>, extensions<0..2^16-1>)
/// ```
pub fn encode_certificate_body(chain: &[Vec<u8>], version: ProtocolVersion) -> Vec<u8> {
    let mut out = Buf::new();
    let mut w = Writer::new(&mut out);
    let tls13 = version == ProtocolVersion::TLS1_3;

    if tls13 {
        // Server certificates carry an empty request context.
        w.put_vec_u8(|_| {});
    }
    w.put_vec_u24(|w| {
        for cert in chain {
            w.put_vec_u24(|w| w.put_bytes(cert));
            if tls13 {
                w.put_vec_u16(|_| {});
            }
        }
    });

    out.into_vec()
}

/// Parse a Certificate handshake body back into the DER chain.
pub fn decode_certificate_body(
    body: &[u8],
    version: ProtocolVersion,
) -> Result<Vec<Vec<u8>>, Error> {
    let tls13 = version == ProtocolVersion::TLS1_3;
    let mut r = Reader::new(body);

    if tls13 {
        let _context = r.read_vec_u8()?;
    }
    let mut list = Reader::new(r.read_vec_u24()?);
    r.expect_end("Certificate")?;

    let mut chain = Vec::new();
    while !list.is_empty() {
        let cert = list.read_vec_u24()?;
        if cert.is_empty() {
            return Err(Error::MalformedMessage("empty certificate entry".into()));
        }
        if tls13 {
            let _extensions = list.read_vec_u16()?;
        }
        chain.push(cert.to_vec());
    }

    Ok(chain)
}

/// Certificate chain plus the matching private key.
///
/// Cheap to clone; the engine hands one copy to every connection.
#[derive(Clone)]
pub struct Identity {
    inner: Arc<IdentityInner>,
}

struct IdentityInner {
    chain: Vec<Vec<u8>>,
    key: Box<dyn SigningKey>,
}

impl Identity {
    /// Load an identity from a PEM certificate chain and a PEM private key.
    ///
    /// The key may be PKCS#8 (`PRIVATE KEY`), PKCS#1 (`RSA PRIVATE KEY`) or
    /// SEC1 (`EC PRIVATE KEY`). Any problem is reported as
    /// [`Error::InvalidCertificateData`], so a server without a usable
    /// identity fails before accepting connections.
    pub fn from_pem(cert_pem: &str, key_pem: &str, config: &Config) -> Result<Self, Error> {
        let chain = parse_pem_chain(cert_pem)?;

        let key_der = pem_sections(key_pem)?
            .into_iter()
            .find(|(label, _)| label.ends_with("PRIVATE KEY"))
            .map(|(_, der)| der)
            .ok_or_else(|| Error::InvalidCertificateData("no PRIVATE KEY section found".into()))?;

        Self::new(chain, &key_der, config)
    }

    /// Build an identity from a DER chain (leaf first) and a DER private key.
    pub fn new(chain: Vec<Vec<u8>>, key_der: &[u8], config: &Config) -> Result<Self, Error> {
        let leaf = chain
            .first()
            .ok_or_else(|| Error::InvalidCertificateData("empty certificate chain".into()))?;

        let key = config
            .crypto_provider()
            .key_provider
            .load_private_key(key_der)
            .map_err(Error::InvalidCertificateData)?;

        let cert = X509Certificate::from_der(leaf)
            .map_err(|e| Error::InvalidCertificateData(format!("bad leaf certificate: {}", e)))?;
        let spki = &cert.tbs_certificate.subject_public_key_info;
        let spki_oid = spki.algorithm.oid;

        let expected = match key.algorithm() {
            SignatureAlgorithm::RSA => RSA_ENCRYPTION,
            SignatureAlgorithm::ECDSA => EC_PUBLIC_KEY,
        };
        if spki_oid != expected {
            return Err(Error::InvalidCertificateData(format!(
                "leaf public key {} does not match {:?} private key",
                spki_oid,
                key.algorithm()
            )));
        }

        let public = key.public_key().map_err(Error::InvalidCertificateData)?;
        if spki.subject_public_key.raw_bytes() != public.as_slice() {
            return Err(Error::InvalidCertificateData(
                "private key does not belong to the leaf certificate".into(),
            ));
        }

        Ok(Identity {
            inner: Arc::new(IdentityInner { chain, key }),
        })
    }

    /// DER certificates, leaf first.
    pub fn chain(&self) -> &[Vec<u8>] {
        &self.inner.chain
    }

    /// Public key algorithm of the leaf.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.inner.key.algorithm()
    }

    pub(crate) fn key(&self) -> &dyn SigningKey {
        &*self.inner.key
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("chain_len", &self.inner.chain.len())
            .field("key", &self.inner.key)
            .finish()
    }
}
