use std::time::Duration;

use crate::crypto::{rust_crypto, CryptoProvider};
use crate::types::{CipherSuite, NamedGroup};
use crate::Error;

/// Largest plaintext fragment a TLS record may carry (2^14).
pub const MAX_FRAGMENT_LEN: usize = 16384;

/// TLS server configuration
#[derive(Debug, Clone)]
pub struct Config {
    handshake_timeout: Duration,
    enable_tls12: bool,
    enable_tls13: bool,
    tls12_cipher_suites: Vec<CipherSuite>,
    tls13_cipher_suites: Vec<CipherSuite>,
    kx_groups: Vec<NamedGroup>,
    with_extended_master_secret: bool,
    max_fragment_len: usize,
    max_queue_rx: usize,
    max_queue_tx: usize,
    crypto_provider: CryptoProvider,
    rng_seed: Option<u64>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            handshake_timeout: Duration::from_secs(10),
            enable_tls12: true,
            enable_tls13: true,
            tls12_cipher_suites: vec![
                CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
                CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
                CipherSuite::RSA_AES128_GCM_SHA256,
                CipherSuite::ECDHE_RSA_CHACHA20_POLY1305_SHA256,
                CipherSuite::ECDHE_RSA_AES128_CBC_SHA256,
                CipherSuite::RSA_AES128_CBC_SHA256,
                CipherSuite::RSA_AES256_CBC_SHA256,
            ],
            tls13_cipher_suites: vec![
                CipherSuite::TLS13_AES_128_GCM_SHA256,
                CipherSuite::TLS13_AES_256_GCM_SHA384,
                CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
            ],
            kx_groups: vec![NamedGroup::X25519, NamedGroup::Secp256r1],
            with_extended_master_secret: true,
            max_fragment_len: MAX_FRAGMENT_LEN,
            max_queue_rx: 64 * 1024,
            max_queue_tx: 64,
            crypto_provider: None,
            rng_seed: None,
        }
    }

    /// Timeout for the entire handshake.
    ///
    /// When it expires the server sends a fatal `handshake_failure` alert.
    #[inline(always)]
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Whether TLS 1.2 may be negotiated.
    #[inline(always)]
    pub fn enable_tls12(&self) -> bool {
        self.enable_tls12
    }

    /// Whether TLS 1.3 may be negotiated.
    #[inline(always)]
    pub fn enable_tls13(&self) -> bool {
        self.enable_tls13
    }

    /// TLS 1.2 cipher suites in server preference order.
    #[inline(always)]
    pub fn tls12_cipher_suites(&self) -> &[CipherSuite] {
        &self.tls12_cipher_suites
    }

    /// TLS 1.3 cipher suites in server preference order.
    #[inline(always)]
    pub fn tls13_cipher_suites(&self) -> &[CipherSuite] {
        &self.tls13_cipher_suites
    }

    /// Key exchange groups in server preference order.
    #[inline(always)]
    pub fn kx_groups(&self) -> &[NamedGroup] {
        &self.kx_groups
    }

    /// Whether to enable Extended Master Secret extension (rfc7627).
    #[inline(always)]
    pub fn with_extended_master_secret(&self) -> bool {
        self.with_extended_master_secret
    }

    /// Largest plaintext carried in one outgoing record.
    #[inline(always)]
    pub fn max_fragment_len(&self) -> usize {
        self.max_fragment_len
    }

    /// Received application bytes a session holds for unanswered reads.
    ///
    /// Past this the session stops reading from its transport.
    #[inline(always)]
    pub fn max_queue_rx(&self) -> usize {
        self.max_queue_rx
    }

    /// Commands a session accepts before they are processed.
    #[inline(always)]
    pub fn max_queue_tx(&self) -> usize {
        self.max_queue_tx
    }

    /// Cryptographic provider.
    ///
    /// Provides all cryptographic operations (ciphers, key exchange, signing, etc.).
    #[inline(always)]
    pub fn crypto_provider(&self) -> &CryptoProvider {
        &self.crypto_provider
    }

    /// Seed for the non-secret random values (server random, session ids).
    ///
    /// `None` in production.
    #[inline(always)]
    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }
}

/// Builder for TLS configuration.
pub struct ConfigBuilder {
    handshake_timeout: Duration,
    enable_tls12: bool,
    enable_tls13: bool,
    tls12_cipher_suites: Vec<CipherSuite>,
    tls13_cipher_suites: Vec<CipherSuite>,
    kx_groups: Vec<NamedGroup>,
    with_extended_master_secret: bool,
    max_fragment_len: usize,
    max_queue_rx: usize,
    max_queue_tx: usize,
    crypto_provider: Option<CryptoProvider>,
    rng_seed: Option<u64>,
}

impl ConfigBuilder {
    /// Set the timeout for the entire handshake.
    ///
    /// Defaults to 10 seconds.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Allow or forbid TLS 1.2.
    ///
    /// Defaults to true.
    pub fn enable_tls12(mut self, enable: bool) -> Self {
        self.enable_tls12 = enable;
        self
    }

    /// Allow or forbid TLS 1.3.
    ///
    /// Defaults to true.
    pub fn enable_tls13(mut self, enable: bool) -> Self {
        self.enable_tls13 = enable;
        self
    }

    /// Set the TLS 1.2 cipher suites in preference order.
    ///
    /// Defaults to ECDHE-RSA-AES128-GCM, ECDHE-ECDSA-AES128-GCM, RSA-AES128-GCM,
    /// ECDHE-RSA-CHACHA20-POLY1305, ECDHE-RSA-AES128-CBC, RSA-AES128-CBC,
    /// RSA-AES256-CBC.
    pub fn tls12_cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.tls12_cipher_suites = suites.to_vec();
        self
    }

    /// Set the TLS 1.3 cipher suites in preference order.
    ///
    /// Defaults to AES-128-GCM, AES-256-GCM, CHACHA20-POLY1305.
    pub fn tls13_cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.tls13_cipher_suites = suites.to_vec();
        self
    }

    /// Set the key exchange groups in preference order.
    ///
    /// Defaults to x25519, secp256r1.
    pub fn kx_groups(mut self, groups: &[NamedGroup]) -> Self {
        self.kx_groups = groups.to_vec();
        self
    }

    /// Set whether to enable Extended Master Secret extension (rfc7627)
    ///
    /// Defaults to true.
    pub fn with_extended_master_secret(mut self, enable: bool) -> Self {
        self.with_extended_master_secret = enable;
        self
    }

    /// Set the largest plaintext carried in one outgoing record.
    ///
    /// Clamped to 2^14. Defaults to 16384.
    pub fn max_fragment_len(mut self, len: usize) -> Self {
        self.max_fragment_len = len;
        self
    }

    /// Set how many received application bytes a session buffers for
    /// unanswered reads before it stops reading from the transport.
    ///
    /// Defaults to 65536.
    pub fn max_queue_rx(mut self, bytes: usize) -> Self {
        self.max_queue_rx = bytes;
        self
    }

    /// Set how many read, write and close requests may wait for a session.
    ///
    /// Defaults to 64.
    pub fn max_queue_tx(mut self, commands: usize) -> Self {
        self.max_queue_tx = commands;
        self
    }

    /// Set a custom crypto provider.
    ///
    /// If not set, [`rust_crypto::default_provider`] is used.
    pub fn with_crypto_provider(mut self, provider: CryptoProvider) -> Self {
        self.crypto_provider = Some(provider);
        self
    }

    /// Seed the non-secret randomness for reproducible tests.
    ///
    /// Defaults to `None`.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// This validates the crypto provider and checks that every configured
    /// suite and group is one the provider implements.
    /// Returns `Error::ConfigError` on any inconsistency.
    pub fn build(self) -> Result<Config, Error> {
        let crypto_provider = self
            .crypto_provider
            .unwrap_or_else(rust_crypto::default_provider);

        crypto_provider.validate()?;

        if !self.enable_tls12 && !self.enable_tls13 {
            return Err(Error::ConfigError("no protocol version enabled".into()));
        }

        for (enabled, suites, tls13) in [
            (self.enable_tls12, &self.tls12_cipher_suites, false),
            (self.enable_tls13, &self.tls13_cipher_suites, true),
        ] {
            if enabled && suites.is_empty() {
                return Err(Error::ConfigError(format!(
                    "no {} cipher suites configured",
                    if tls13 { "TLS 1.3" } else { "TLS 1.2" }
                )));
            }
            for suite in suites.iter() {
                let ok = suite.descriptor().map(|d| d.is_tls13()) == Some(tls13)
                    && crypto_provider.find_cipher_suite(*suite).is_some();
                if !ok {
                    return Err(Error::ConfigError(format!(
                        "cipher suite {:?} is not usable here",
                        suite
                    )));
                }
            }
        }

        if self.kx_groups.is_empty() {
            return Err(Error::ConfigError("no key exchange groups configured".into()));
        }
        for group in &self.kx_groups {
            if crypto_provider.find_kx_group(*group).is_none() {
                return Err(Error::ConfigError(format!(
                    "key exchange group {:?} not in provider",
                    group
                )));
            }
        }

        if self.max_fragment_len == 0 {
            return Err(Error::ConfigError("max_fragment_len must be positive".into()));
        }
        if self.max_queue_rx == 0 || self.max_queue_tx == 0 {
            return Err(Error::ConfigError("queue limits must be positive".into()));
        }

        Ok(Config {
            handshake_timeout: self.handshake_timeout,
            enable_tls12: self.enable_tls12,
            enable_tls13: self.enable_tls13,
            tls12_cipher_suites: self.tls12_cipher_suites,
            tls13_cipher_suites: self.tls13_cipher_suites,
            kx_groups: self.kx_groups,
            with_extended_master_secret: self.with_extended_master_secret,
            max_fragment_len: self.max_fragment_len.min(MAX_FRAGMENT_LEN),
            max_queue_rx: self.max_queue_rx,
            max_queue_tx: self.max_queue_tx,
            crypto_provider,
            rng_seed: self.rng_seed,
        })
    }
}
