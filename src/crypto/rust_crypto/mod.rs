//! RustCrypto cryptographic provider implementation.
//!
//! A pure Rust backend built on crates from the
//! [RustCrypto](https://github.com/RustCrypto) organization, plus
//! `x25519-dalek` for X25519.
//!
//! # Usage
//!
//! ```
//! use timpl::Config;
//! use timpl::crypto::rust_crypto;
//!
//! let config = Config::builder()
//!     .with_crypto_provider(rust_crypto::default_provider())
//!     .build()
//!     .unwrap();
//! ```

mod cipher_suite;
mod hash;
mod hkdf;
mod hmac;
mod kx_group;
mod sign;
mod tls12;

use crate::crypto::provider::CryptoProvider;

/// Get the default RustCrypto-based crypto provider.
///
/// # Supported Cipher Suites
///
/// TLS 1.3:
/// - `TLS_AES_128_GCM_SHA256` (0x1301)
/// - `TLS_AES_256_GCM_SHA384` (0x1302)
/// - `TLS_CHACHA20_POLY1305_SHA256` (0x1303)
///
/// TLS 1.2:
/// - `TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256` (0xC02B)
/// - `TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256` (0xC02F)
/// - `TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256` (0xCCA8)
/// - `TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256` (0xC027)
/// - `TLS_RSA_WITH_AES_128_GCM_SHA256` (0x009C)
/// - `TLS_RSA_WITH_AES_128_CBC_SHA256` (0x003C)
/// - `TLS_RSA_WITH_AES_256_CBC_SHA256` (0x003D)
///
/// # Supported Key Exchange Groups
///
/// - `x25519`
/// - `secp256r1` (P-256)
/// - `secp384r1` (P-384)
///
/// # Key Formats
///
/// The key provider loads DER private keys in PKCS#8 (RSA, P-256, P-384),
/// PKCS#1 (RSA) and SEC1 (P-256, P-384) form.
///
/// # Random Number Generation
///
/// Uses `OsRng` from the `rand` crate.
pub fn default_provider() -> CryptoProvider {
    CryptoProvider {
        cipher_suites: cipher_suite::ALL_CIPHER_SUITES,
        kx_groups: kx_group::ALL_KX_GROUPS,
        key_provider: &sign::KEY_PROVIDER,
        secure_random: &tls12::SECURE_RANDOM,
        hash_provider: &hash::HASH_PROVIDER,
        hmac_provider: &hmac::HMAC_PROVIDER,
        prf_provider: &tls12::PRF_PROVIDER,
        hkdf_provider: &hkdf::HKDF_PROVIDER,
    }
}
