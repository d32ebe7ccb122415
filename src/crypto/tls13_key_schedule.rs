//! TLS 1.3 Key Schedule (RFC 8446 Section 7.1)
//!
//! This module implements the TLS 1.3 key schedule, which derives all keys
//! and secrets used during the handshake and application data phases.
//!
//! ```text
//!              0
//!              |
//!              v
//!    PSK ->  HKDF-Extract = Early Secret
//!              |
//!              v
//!        Derive-Secret(., "derived", "")
//!              |
//!              v
//!    (EC)DHE -> HKDF-Extract = Handshake Secret
//!              |
//!              +-----> Derive-Secret(., "c hs traffic",
//!              |                     ClientHello...ServerHello)
//!              |                     = client_handshake_traffic_secret
//!              |
//!              +-----> Derive-Secret(., "s hs traffic",
//!              |                     ClientHello...ServerHello)
//!              |                     = server_handshake_traffic_secret
//!              v
//!        Derive-Secret(., "derived", "")
//!              |
//!              v
//!    0 -> HKDF-Extract = Master Secret
//!              |
//!              +-----> Derive-Secret(., "c ap traffic",
//!              |                     ClientHello...server Finished)
//!              |                     = client_application_traffic_secret_0
//!              |
//!              +-----> Derive-Secret(., "s ap traffic",
//!                                    ClientHello...server Finished)
//!                                    = server_application_traffic_secret_0
//! ```
//!
//! There is no PSK support, so the early secret always starts from zeros.

use crate::buffer::Buf;
use crate::crypto::provider::{HkdfProvider, HmacProvider};
use crate::crypto::CryptoProvider;
use crate::types::HashAlgorithm;
use crate::Error;

/// TLS 1.3 Key Schedule.
///
/// Tracks the running secret (derived, then master). Traffic secrets are
/// returned to the caller, which owns them for the lifetime of an epoch.
#[derive(Debug)]
pub struct KeySchedule {
    hkdf: &'static dyn HkdfProvider,
    hmac: &'static dyn HmacProvider,
    hash: HashAlgorithm,
    /// Hash("") for the "derived" steps.
    empty_hash: Buf,
    current_secret: Buf,
}

impl KeySchedule {
    /// Create a key schedule without PSK.
    ///
    /// This starts from zeros and immediately derives to the "derived"
    /// secret, ready for the ECDHE input.
    pub fn new(provider: &CryptoProvider, hash: HashAlgorithm) -> Result<Self, Error> {
        let mut empty_hash = Buf::new();
        provider.hash(hash, &[], &mut empty_hash);

        let mut ks = KeySchedule {
            hkdf: provider.hkdf_provider,
            hmac: provider.hmac_provider,
            hash,
            empty_hash,
            current_secret: Buf::new(),
        };

        // Early Secret = HKDF-Extract(0, 0)
        let zeros = vec![0u8; hash.output_len()];
        let mut early_secret = Buf::new();
        ks.hkdf
            .hkdf_extract(hash, &[], &zeros, &mut early_secret)
            .map_err(Error::CryptoError)?;

        ks.current_secret = ks.derived(&early_secret)?;
        early_secret.zeroize();
        Ok(ks)
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    /// Inject the ECDHE shared secret and derive the handshake traffic secrets.
    ///
    /// Returns (client_handshake_traffic_secret, server_handshake_traffic_secret).
    pub fn derive_handshake_secrets(
        &mut self,
        shared_secret: &[u8],
        transcript_hash: &[u8],
    ) -> Result<(Buf, Buf), Error> {
        // Handshake Secret = HKDF-Extract(derived, ECDHE)
        let mut handshake_secret = Buf::new();
        self.hkdf
            .hkdf_extract(
                self.hash,
                &self.current_secret,
                shared_secret,
                &mut handshake_secret,
            )
            .map_err(Error::CryptoError)?;

        let client = self.derive_secret(&handshake_secret, b"c hs traffic", transcript_hash)?;
        let server = self.derive_secret(&handshake_secret, b"s hs traffic", transcript_hash)?;

        self.current_secret.zeroize();
        self.current_secret = self.derived(&handshake_secret)?;
        handshake_secret.zeroize();

        Ok((client, server))
    }

    /// Derive the application traffic secrets.
    ///
    /// The transcript hash covers ClientHello up to and including the server
    /// Finished. Returns (client_application_traffic_secret_0,
    /// server_application_traffic_secret_0).
    pub fn derive_application_secrets(
        &mut self,
        transcript_hash: &[u8],
    ) -> Result<(Buf, Buf), Error> {
        // Master Secret = HKDF-Extract(derived, 0)
        let zeros = vec![0u8; self.hash.output_len()];
        let mut master_secret = Buf::new();
        self.hkdf
            .hkdf_extract(self.hash, &self.current_secret, &zeros, &mut master_secret)
            .map_err(Error::CryptoError)?;

        let client = self.derive_secret(&master_secret, b"c ap traffic", transcript_hash)?;
        let server = self.derive_secret(&master_secret, b"s ap traffic", transcript_hash)?;

        self.current_secret.zeroize();
        self.current_secret = master_secret;

        Ok((client, server))
    }

    /// Derive the record key and IV from a traffic secret.
    ///
    /// Returns (key, iv).
    pub fn derive_traffic_keys(
        &self,
        traffic_secret: &[u8],
        key_len: usize,
        iv_len: usize,
    ) -> Result<(Buf, Buf), Error> {
        let key = self.expand_label(traffic_secret, b"key", &[], key_len)?;
        let iv = self.expand_label(traffic_secret, b"iv", &[], iv_len)?;
        Ok((key, iv))
    }

    /// Finished verify_data (RFC 8446 Section 4.4.4).
    ///
    /// finished_key = HKDF-Expand-Label(BaseKey, "finished", "", Hash.length)
    /// verify_data = HMAC(finished_key, transcript_hash)
    pub fn finished_verify_data(
        &self,
        base_key: &[u8],
        transcript_hash: &[u8],
    ) -> Result<Buf, Error> {
        let mut finished_key =
            self.expand_label(base_key, b"finished", &[], self.hash.output_len())?;

        let mut verify_data = Buf::new();
        self.hmac
            .hmac(self.hash, &finished_key, &[transcript_hash], &mut verify_data)
            .map_err(Error::CryptoError)?;
        finished_key.zeroize();

        Ok(verify_data)
    }

    /// Next application traffic secret for KeyUpdate (RFC 8446 Section 7.2).
    ///
    /// application_traffic_secret_N+1 =
    ///     HKDF-Expand-Label(application_traffic_secret_N, "traffic upd", "", Hash.length)
    pub fn next_traffic_secret(&self, current_secret: &[u8]) -> Result<Buf, Error> {
        self.expand_label(current_secret, b"traffic upd", &[], self.hash.output_len())
    }

    /// Derive-Secret(Secret, Label, Messages) with the transcript hash already computed.
    fn derive_secret(&self, secret: &[u8], label: &[u8], hash: &[u8]) -> Result<Buf, Error> {
        self.expand_label(secret, label, hash, self.hash.output_len())
    }

    /// Derive-Secret(., "derived", "")
    fn derived(&self, secret: &[u8]) -> Result<Buf, Error> {
        self.expand_label(
            secret,
            b"derived",
            &self.empty_hash,
            self.hash.output_len(),
        )
    }

    fn expand_label(
        &self,
        secret: &[u8],
        label: &[u8],
        context: &[u8],
        len: usize,
    ) -> Result<Buf, Error> {
        let mut out = Buf::new();
        self.hkdf
            .hkdf_expand_label(self.hash, secret, label, context, &mut out, len)
            .map_err(Error::CryptoError)?;
        Ok(out)
    }
}

impl Drop for KeySchedule {
    fn drop(&mut self) {
        self.current_secret.zeroize();
    }
}
