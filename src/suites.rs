//! Static cipher suite descriptors.
//!
//! One entry per suite the engine can negotiate. The record layer sizes its
//! keys, IVs and tags from these entries and the key schedules pick their hash
//! from them. The table is immutable and process-wide.

use crate::types::{CipherSuite, HashAlgorithm, ProtocolVersion, SignatureAlgorithm};

/// How the premaster secret is established for a TLS 1.2 suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchangeAlgorithm {
    /// Client encrypts the premaster secret to the server's RSA key.
    Rsa,
    /// Ephemeral elliptic curve Diffie-Hellman, signed by the server.
    Ecdhe,
    /// TLS 1.3 suites leave the key exchange to `key_share`.
    Negotiated,
}

/// Bulk encryption algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkCipher {
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
    Aes128Cbc,
    Aes256Cbc,
}

impl BulkCipher {
    pub fn is_aead(&self) -> bool {
        !matches!(self, BulkCipher::Aes128Cbc | BulkCipher::Aes256Cbc)
    }
}

/// Record integrity algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAlgorithm {
    /// Integrity comes from the AEAD tag.
    Aead,
    HmacSha256,
}

/// Static description of one cipher suite.
#[derive(Debug, PartialEq, Eq)]
pub struct CipherSuiteDescriptor {
    pub suite: CipherSuite,
    pub version: ProtocolVersion,
    pub key_exchange: KeyExchangeAlgorithm,
    /// Required identity type. `None` for TLS 1.3 suites.
    pub authentication: Option<SignatureAlgorithm>,
    pub bulk: BulkCipher,
    pub mac: MacAlgorithm,
    /// Hash for the PRF / HKDF and the transcript.
    pub hash: HashAlgorithm,
    pub key_len: usize,
    /// Implicit IV bytes taken from the key block / traffic secret.
    pub fixed_iv_len: usize,
    /// Explicit per-record IV or nonce bytes carried on the wire.
    pub record_iv_len: usize,
    pub mac_key_len: usize,
    /// AEAD tag length, or HMAC output length for CBC suites.
    pub tag_len: usize,
}

impl CipherSuiteDescriptor {
    /// Length of the TLS 1.2 key block for this suite.
    pub fn key_block_len(&self) -> usize {
        2 * (self.mac_key_len + self.key_len + self.fixed_iv_len)
    }

    pub fn is_tls13(&self) -> bool {
        self.version == ProtocolVersion::TLS1_3
    }
}

const fn tls13(
    suite: CipherSuite,
    bulk: BulkCipher,
    hash: HashAlgorithm,
    key_len: usize,
) -> CipherSuiteDescriptor {
    CipherSuiteDescriptor {
        suite,
        version: ProtocolVersion::TLS1_3,
        key_exchange: KeyExchangeAlgorithm::Negotiated,
        authentication: None,
        bulk,
        mac: MacAlgorithm::Aead,
        hash,
        key_len,
        fixed_iv_len: 12,
        record_iv_len: 0,
        mac_key_len: 0,
        tag_len: 16,
    }
}

const fn tls12_gcm(
    suite: CipherSuite,
    key_exchange: KeyExchangeAlgorithm,
    auth: SignatureAlgorithm,
) -> CipherSuiteDescriptor {
    CipherSuiteDescriptor {
        suite,
        version: ProtocolVersion::TLS1_2,
        key_exchange,
        authentication: Some(auth),
        bulk: BulkCipher::Aes128Gcm,
        mac: MacAlgorithm::Aead,
        hash: HashAlgorithm::SHA256,
        key_len: 16,
        // RFC 5288: 4 byte salt, 8 byte explicit nonce
        fixed_iv_len: 4,
        record_iv_len: 8,
        mac_key_len: 0,
        tag_len: 16,
    }
}

const fn tls12_cbc(
    suite: CipherSuite,
    key_exchange: KeyExchangeAlgorithm,
    bulk: BulkCipher,
    key_len: usize,
) -> CipherSuiteDescriptor {
    CipherSuiteDescriptor {
        suite,
        version: ProtocolVersion::TLS1_2,
        key_exchange,
        authentication: Some(SignatureAlgorithm::RSA),
        bulk,
        mac: MacAlgorithm::HmacSha256,
        hash: HashAlgorithm::SHA256,
        key_len,
        fixed_iv_len: 0,
        record_iv_len: 16,
        mac_key_len: 32,
        tag_len: 32,
    }
}

/// Every suite the engine knows about.
pub static CIPHER_SUITES: &[CipherSuiteDescriptor] = &[
    tls13(
        CipherSuite::TLS13_AES_128_GCM_SHA256,
        BulkCipher::Aes128Gcm,
        HashAlgorithm::SHA256,
        16,
    ),
    tls13(
        CipherSuite::TLS13_AES_256_GCM_SHA384,
        BulkCipher::Aes256Gcm,
        HashAlgorithm::SHA384,
        32,
    ),
    tls13(
        CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
        BulkCipher::ChaCha20Poly1305,
        HashAlgorithm::SHA256,
        32,
    ),
    tls12_gcm(
        CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
        KeyExchangeAlgorithm::Ecdhe,
        SignatureAlgorithm::RSA,
    ),
    tls12_gcm(
        CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
        KeyExchangeAlgorithm::Ecdhe,
        SignatureAlgorithm::ECDSA,
    ),
    tls12_gcm(
        CipherSuite::RSA_AES128_GCM_SHA256,
        KeyExchangeAlgorithm::Rsa,
        SignatureAlgorithm::RSA,
    ),
    // RFC 7905: 12 byte implicit IV, no explicit nonce
    CipherSuiteDescriptor {
        suite: CipherSuite::ECDHE_RSA_CHACHA20_POLY1305_SHA256,
        version: ProtocolVersion::TLS1_2,
        key_exchange: KeyExchangeAlgorithm::Ecdhe,
        authentication: Some(SignatureAlgorithm::RSA),
        bulk: BulkCipher::ChaCha20Poly1305,
        mac: MacAlgorithm::Aead,
        hash: HashAlgorithm::SHA256,
        key_len: 32,
        fixed_iv_len: 12,
        record_iv_len: 0,
        mac_key_len: 0,
        tag_len: 16,
    },
    tls12_cbc(
        CipherSuite::ECDHE_RSA_AES128_CBC_SHA256,
        KeyExchangeAlgorithm::Ecdhe,
        BulkCipher::Aes128Cbc,
        16,
    ),
    tls12_cbc(
        CipherSuite::RSA_AES128_CBC_SHA256,
        KeyExchangeAlgorithm::Rsa,
        BulkCipher::Aes128Cbc,
        16,
    ),
    tls12_cbc(
        CipherSuite::RSA_AES256_CBC_SHA256,
        KeyExchangeAlgorithm::Rsa,
        BulkCipher::Aes256Cbc,
        32,
    ),
];

impl CipherSuite {
    /// Look up the static descriptor. `None` for unknown or signalling values.
    pub fn descriptor(&self) -> Option<&'static CipherSuiteDescriptor> {
        CIPHER_SUITES.iter().find(|d| d.suite == *self)
    }
}
