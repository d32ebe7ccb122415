//! Cryptographic primitives and helpers used by the TLS engine.

pub mod rust_crypto;

mod aead;
pub mod prf;
pub mod provider;
mod tls13_key_schedule;
mod transcript;

// Re-export AEAD types needed for Cipher trait implementations (public API)
pub use aead::{Aad, Nonce};

pub(crate) use aead::GCM_EXPLICIT_NONCE_LEN;

pub use provider::{
    ActiveKeyExchange, BlockCipher, Cipher, CryptoProvider, CryptoSafe, HashContext,
    HashProvider, RecordCipher,
};
pub use provider::{HkdfProvider, HmacProvider, KeyProvider, PrfProvider};
pub use provider::{SecureRandom, SigningKey, SupportedCipherSuite, SupportedKxGroup};

pub use tls13_key_schedule::KeySchedule;
pub use transcript::Transcript;

// Re-export shared types for provider trait implementations
pub use crate::types::{HashAlgorithm, NamedGroup, SignatureAlgorithm, SignatureScheme};
