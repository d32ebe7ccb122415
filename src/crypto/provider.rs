//! Cryptographic provider traits for pluggable crypto backends.
//!
//! The engine never calls a cipher, hash or key exchange directly. It goes
//! through a [`CryptoProvider`], a struct of `&'static dyn` components, each
//! covering one capability:
//!
//! - **Cipher suites** ([`SupportedCipherSuite`]): factory for record ciphers
//! - **Key exchange groups** ([`SupportedKxGroup`]): factory for ECDHE exchanges
//! - **Key provider** ([`KeyProvider`]): load the server's private key
//! - **Secure random** ([`SecureRandom`])
//! - **Hash provider** ([`HashProvider`]): transcript hashing
//! - **HMAC provider** ([`HmacProvider`]): Finished MACs and CBC record MACs
//! - **PRF provider** ([`PrfProvider`]): TLS 1.2 key derivation
//! - **HKDF provider** ([`HkdfProvider`]): TLS 1.3 key derivation
//!
//! The default implementation lives in [`rust_crypto`](super::rust_crypto).
//! A custom backend implements the traits on static values and fills a
//! [`CryptoProvider`] with references to them.
//!
//! All components are `Send + Sync + UnwindSafe + RefUnwindSafe` so a provider
//! can be shared across connection tasks.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};

use crate::buffer::{Buf, TmpBuf};
use crate::crypto::{Aad, Nonce};
use crate::types::{CipherSuite, HashAlgorithm, NamedGroup, SignatureAlgorithm, SignatureScheme};
use crate::Error;

// ============================================================================
// Marker Trait
// ============================================================================

/// Bounds shared by every provider component.
pub trait CryptoSafe: Send + Sync + Debug + UnwindSafe + RefUnwindSafe {}

impl<T: Send + Sync + Debug + UnwindSafe + RefUnwindSafe> CryptoSafe for T {}

// ============================================================================
// Instance Traits (created by factories)
// ============================================================================

/// AEAD cipher for in-place encryption/decryption.
pub trait Cipher: CryptoSafe {
    /// Encrypt plaintext in place, appending the authentication tag.
    fn encrypt(&mut self, plaintext: &mut Buf, aad: Aad, nonce: Nonce) -> Result<(), String>;

    /// Decrypt ciphertext in place, verifying and removing the tag.
    fn decrypt(&mut self, ciphertext: &mut TmpBuf, aad: Aad, nonce: Nonce) -> Result<(), String>;
}

/// Raw CBC block cipher. Padding and MAC are handled by the record layer.
pub trait BlockCipher: CryptoSafe {
    /// Block size in bytes.
    fn block_len(&self) -> usize;

    /// CBC-encrypt `data` in place. `data` must be block aligned.
    fn encrypt(&mut self, iv: &[u8], data: &mut [u8]) -> Result<(), String>;

    /// CBC-decrypt `data` in place. `data` must be block aligned.
    fn decrypt(&mut self, iv: &[u8], data: &mut [u8]) -> Result<(), String>;
}

/// A keyed record cipher.
#[derive(Debug)]
pub enum RecordCipher {
    Aead(Box<dyn Cipher>),
    Block(Box<dyn BlockCipher>),
}

/// Stateful hash context for incremental hashing.
pub trait HashContext: CryptoSafe {
    fn update(&mut self, data: &[u8]);

    /// Clone the context and finalize the clone into `out`.
    fn clone_and_finalize(&self, out: &mut Buf);
}

/// The server's private key.
pub trait SigningKey: CryptoSafe {
    /// Public key algorithm of this key.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// The matching public key as the `subjectPublicKey` bits of a
    /// certificate: a PKCS#1 `RSAPublicKey` or an uncompressed SEC1 point.
    fn public_key(&self) -> Result<Vec<u8>, String>;

    /// Schemes this key can produce, in server preference order.
    fn supported_schemes(&self) -> &'static [SignatureScheme];

    /// Sign `message` with `scheme`. The implementation hashes the message.
    fn sign(&self, scheme: SignatureScheme, message: &[u8], out: &mut Buf) -> Result<(), String>;

    /// RSAES-PKCS1-v1_5 decryption of a client key exchange.
    fn decrypt(&self, _ciphertext: &[u8], _out: &mut Buf) -> Result<(), String> {
        Err("key does not support decryption".to_string())
    }
}

/// Ephemeral keypair for one handshake.
pub trait ActiveKeyExchange: CryptoSafe {
    /// Our public key in wire format.
    fn pub_key(&self) -> &[u8];

    /// Complete the exchange with the peer's public key, writing the shared secret.
    fn complete(self: Box<Self>, peer_pub: &[u8], out: &mut Buf) -> Result<(), String>;

    fn group(&self) -> NamedGroup;
}

// ============================================================================
// Factory Traits (referenced by CryptoProvider)
// ============================================================================

/// Cipher suite support (factory for record ciphers).
///
/// Sizes and algorithms come from the suite's static
/// [`CipherSuiteDescriptor`](crate::suites::CipherSuiteDescriptor).
pub trait SupportedCipherSuite: CryptoSafe {
    fn suite(&self) -> CipherSuite;

    /// Create a keyed cipher for one direction.
    fn create_cipher(&self, key: &[u8]) -> Result<RecordCipher, String>;
}

/// Key exchange group support (factory for ActiveKeyExchange).
pub trait SupportedKxGroup: CryptoSafe {
    fn name(&self) -> NamedGroup;

    /// Generate an ephemeral keypair.
    fn start_exchange(&self) -> Result<Box<dyn ActiveKeyExchange>, String>;
}

/// Private key parser (factory for SigningKey).
pub trait KeyProvider: CryptoSafe {
    /// Load a DER encoded private key (PKCS#8, PKCS#1 RSA or SEC1 EC).
    fn load_private_key(&self, key_der: &[u8]) -> Result<Box<dyn SigningKey>, String>;
}

/// Secure random number generator.
pub trait SecureRandom: CryptoSafe {
    fn fill(&self, buf: &mut [u8]) -> Result<(), String>;
}

/// Hash provider (factory for HashContext).
pub trait HashProvider: CryptoSafe {
    fn create_hash(&self, algorithm: HashAlgorithm) -> Box<dyn HashContext>;
}

/// HMAC over a single message.
pub trait HmacProvider: CryptoSafe {
    fn hmac(
        &self,
        hash: HashAlgorithm,
        key: &[u8],
        data: &[&[u8]],
        out: &mut Buf,
    ) -> Result<(), String>;
}

/// TLS 1.2 PRF (RFC 5246 Section 5).
pub trait PrfProvider: CryptoSafe {
    /// PRF(secret, label, seed) into `out`. `scratch` holds label + seed.
    #[allow(clippy::too_many_arguments)]
    fn prf_tls12(
        &self,
        secret: &[u8],
        label: &str,
        seed: &[u8],
        out: &mut Buf,
        output_len: usize,
        scratch: &mut Buf,
        hash: HashAlgorithm,
    ) -> Result<(), String>;
}

/// HKDF for the TLS 1.3 key schedule (RFC 5869, RFC 8446 Section 7.1).
pub trait HkdfProvider: CryptoSafe {
    /// PRK = HKDF-Extract(salt, IKM)
    fn hkdf_extract(
        &self,
        hash: HashAlgorithm,
        salt: &[u8],
        ikm: &[u8],
        out: &mut Buf,
    ) -> Result<(), String>;

    /// OKM = HKDF-Expand(PRK, info, L)
    fn hkdf_expand(
        &self,
        hash: HashAlgorithm,
        prk: &[u8],
        info: &[u8],
        out: &mut Buf,
        output_len: usize,
    ) -> Result<(), String>;

    /// HKDF-Expand-Label with the `"tls13 "` prefix.
    ///
    /// ```text
    /// HkdfLabel = struct {
    ///     uint16 length;
    ///     opaque label<7..255> = "tls13 " + Label;
    ///     opaque context<0..255> = Context;
    /// }
    /// ```
    fn hkdf_expand_label(
        &self,
        hash: HashAlgorithm,
        secret: &[u8],
        label: &[u8],
        context: &[u8],
        out: &mut Buf,
        output_len: usize,
    ) -> Result<(), String>;
}

// ============================================================================
// Core Provider Struct
// ============================================================================

/// Cryptographic provider for the engine.
#[derive(Debug, Clone)]
pub struct CryptoProvider {
    /// Supported cipher suites, both TLS 1.2 and TLS 1.3.
    pub cipher_suites: &'static [&'static dyn SupportedCipherSuite],

    /// Supported key exchange groups.
    pub kx_groups: &'static [&'static dyn SupportedKxGroup],

    pub key_provider: &'static dyn KeyProvider,

    pub secure_random: &'static dyn SecureRandom,

    pub hash_provider: &'static dyn HashProvider,

    pub hmac_provider: &'static dyn HmacProvider,

    /// TLS 1.2 key derivation.
    pub prf_provider: &'static dyn PrfProvider,

    /// TLS 1.3 key derivation.
    pub hkdf_provider: &'static dyn HkdfProvider,
}

impl CryptoProvider {
    /// Find the factory for a suite.
    pub fn find_cipher_suite(&self, suite: CipherSuite) -> Option<&'static dyn SupportedCipherSuite> {
        self.cipher_suites.iter().find(|s| s.suite() == suite).copied()
    }

    /// Find the factory for a key exchange group.
    pub fn find_kx_group(&self, group: NamedGroup) -> Option<&'static dyn SupportedKxGroup> {
        self.kx_groups.iter().find(|g| g.name() == group).copied()
    }

    /// Check that the provider is usable.
    ///
    /// Every suite must have a static descriptor and at least one key exchange
    /// group must be present.
    pub fn validate(&self) -> Result<(), Error> {
        if self.cipher_suites.is_empty() {
            return Err(Error::ConfigError("provider has no cipher suites".into()));
        }
        for s in self.cipher_suites {
            if s.suite().descriptor().is_none() {
                return Err(Error::ConfigError(format!(
                    "provider cipher suite {:?} has no descriptor",
                    s.suite()
                )));
            }
        }
        if self.kx_groups.is_empty() {
            return Err(Error::ConfigError(
                "provider has no key exchange groups".into(),
            ));
        }
        Ok(())
    }

    /// Fill `out` from the secure random source.
    pub(crate) fn random(&self, out: &mut [u8]) -> Result<(), Error> {
        self.secure_random.fill(out).map_err(Error::CryptoError)
    }

    /// Hash a single message.
    pub(crate) fn hash(&self, alg: HashAlgorithm, data: &[u8], out: &mut Buf) {
        let mut ctx = self.hash_provider.create_hash(alg);
        ctx.update(data);
        ctx.clone_and_finalize(out);
    }
}
