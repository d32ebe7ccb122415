//! Cipher suite implementations using RustCrypto.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chacha20poly1305::ChaCha20Poly1305;
use zeroize::Zeroizing;

use crate::buffer::{Buf, TmpBuf};
use crate::crypto::provider::{BlockCipher, Cipher, RecordCipher, SupportedCipherSuite};
use crate::crypto::{Aad, Nonce};
use crate::suites::BulkCipher;
use crate::types::CipherSuite;

// ============================================================================
// AEAD ciphers
// ============================================================================

/// AES-GCM cipher implementation using RustCrypto.
enum AesGcm {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl std::fmt::Debug for AesGcm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AesGcm::Aes128(_) => f.debug_tuple("AesGcm::Aes128").finish(),
            AesGcm::Aes256(_) => f.debug_tuple("AesGcm::Aes256").finish(),
        }
    }
}

impl AesGcm {
    fn new(key: &[u8]) -> Result<Self, String> {
        match key.len() {
            16 => Ok(AesGcm::Aes128(Box::new(
                Aes128Gcm::new_from_slice(key).map_err(|_| "Invalid AES-128-GCM key")?,
            ))),
            32 => Ok(AesGcm::Aes256(Box::new(
                Aes256Gcm::new_from_slice(key).map_err(|_| "Invalid AES-256-GCM key")?,
            ))),
            _ => Err(format!("Invalid key size for AES-GCM: {}", key.len())),
        }
    }
}

impl Cipher for AesGcm {
    fn encrypt(&mut self, data: &mut Buf, aad: Aad, nonce: Nonce) -> Result<(), String> {
        let n = aes_gcm::Nonce::<U12>::from_slice(&nonce);
        match self {
            AesGcm::Aes128(cipher) => cipher.encrypt_in_place(n, &aad, data),
            AesGcm::Aes256(cipher) => cipher.encrypt_in_place(n, &aad, data),
        }
        .map_err(|_| "AES-GCM encryption failed".to_string())
    }

    fn decrypt(&mut self, ciphertext: &mut TmpBuf, aad: Aad, nonce: Nonce) -> Result<(), String> {
        if ciphertext.len() < 16 {
            return Err(format!("Ciphertext too short: {}", ciphertext.len()));
        }
        let n = aes_gcm::Nonce::<U12>::from_slice(&nonce);
        // decrypt_in_place removes the tag and shortens the buffer
        match self {
            AesGcm::Aes128(cipher) => cipher.decrypt_in_place(n, &aad, ciphertext),
            AesGcm::Aes256(cipher) => cipher.decrypt_in_place(n, &aad, ciphertext),
        }
        .map_err(|_| "AES-GCM decryption failed".to_string())
    }
}

/// ChaCha20-Poly1305 cipher implementation using RustCrypto.
struct ChaCha(Box<ChaCha20Poly1305>);

impl std::fmt::Debug for ChaCha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ChaCha20Poly1305").finish()
    }
}

impl ChaCha {
    fn new(key: &[u8]) -> Result<Self, String> {
        let cipher = ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| format!("Invalid key size for ChaCha20-Poly1305: {}", key.len()))?;
        Ok(ChaCha(Box::new(cipher)))
    }
}

impl Cipher for ChaCha {
    fn encrypt(&mut self, data: &mut Buf, aad: Aad, nonce: Nonce) -> Result<(), String> {
        let n = chacha20poly1305::Nonce::from_slice(&nonce);
        self.0
            .encrypt_in_place(n, &aad, data)
            .map_err(|_| "ChaCha20-Poly1305 encryption failed".to_string())
    }

    fn decrypt(&mut self, ciphertext: &mut TmpBuf, aad: Aad, nonce: Nonce) -> Result<(), String> {
        if ciphertext.len() < 16 {
            return Err(format!("Ciphertext too short: {}", ciphertext.len()));
        }
        let n = chacha20poly1305::Nonce::from_slice(&nonce);
        self.0
            .decrypt_in_place(n, &aad, ciphertext)
            .map_err(|_| "ChaCha20-Poly1305 decryption failed".to_string())
    }
}

// ============================================================================
// CBC block cipher
// ============================================================================

const AES_BLOCK_LEN: usize = 16;

/// AES-CBC without padding. The record layer pads and MACs.
struct AesCbc {
    key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for AesCbc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesCbc")
            .field("key_bits", &(self.key.len() * 8))
            .finish()
    }
}

impl AesCbc {
    fn new(key: &[u8]) -> Result<Self, String> {
        if key.len() != 16 && key.len() != 32 {
            return Err(format!("Invalid key size for AES-CBC: {}", key.len()));
        }
        Ok(AesCbc {
            key: Zeroizing::new(key.to_vec()),
        })
    }

    fn check(&self, iv: &[u8], data: &[u8]) -> Result<(), String> {
        if iv.len() != AES_BLOCK_LEN {
            return Err(format!("Invalid CBC IV length: {}", iv.len()));
        }
        if data.len() % AES_BLOCK_LEN != 0 {
            return Err(format!("CBC data not block aligned: {}", data.len()));
        }
        Ok(())
    }
}

impl BlockCipher for AesCbc {
    fn block_len(&self) -> usize {
        AES_BLOCK_LEN
    }

    fn encrypt(&mut self, iv: &[u8], data: &mut [u8]) -> Result<(), String> {
        self.check(iv, data)?;
        let len = data.len();
        let res = if self.key.len() == 16 {
            cbc::Encryptor::<aes::Aes128>::new_from_slices(&self.key, iv)
                .map_err(|_| "Invalid AES-CBC key or IV")?
                .encrypt_padded_mut::<NoPadding>(data, len)
                .map(|_| ())
        } else {
            cbc::Encryptor::<aes::Aes256>::new_from_slices(&self.key, iv)
                .map_err(|_| "Invalid AES-CBC key or IV")?
                .encrypt_padded_mut::<NoPadding>(data, len)
                .map(|_| ())
        };
        res.map_err(|_| "AES-CBC encryption failed".to_string())
    }

    fn decrypt(&mut self, iv: &[u8], data: &mut [u8]) -> Result<(), String> {
        self.check(iv, data)?;
        let res = if self.key.len() == 16 {
            cbc::Decryptor::<aes::Aes128>::new_from_slices(&self.key, iv)
                .map_err(|_| "Invalid AES-CBC key or IV")?
                .decrypt_padded_mut::<NoPadding>(data)
                .map(|_| ())
        } else {
            cbc::Decryptor::<aes::Aes256>::new_from_slices(&self.key, iv)
                .map_err(|_| "Invalid AES-CBC key or IV")?
                .decrypt_padded_mut::<NoPadding>(data)
                .map(|_| ())
        };
        res.map_err(|_| "AES-CBC decryption failed".to_string())
    }
}

// ============================================================================
// Suites
// ============================================================================

/// A cipher suite backed by RustCrypto. Sizes come from the suite descriptor.
#[derive(Debug)]
struct RustCryptoSuite(CipherSuite);

impl SupportedCipherSuite for RustCryptoSuite {
    fn suite(&self) -> CipherSuite {
        self.0
    }

    fn create_cipher(&self, key: &[u8]) -> Result<RecordCipher, String> {
        let descriptor = self
            .0
            .descriptor()
            .ok_or_else(|| format!("No descriptor for {:?}", self.0))?;

        let cipher = match descriptor.bulk {
            BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm => {
                RecordCipher::Aead(Box::new(AesGcm::new(key)?))
            }
            BulkCipher::ChaCha20Poly1305 => RecordCipher::Aead(Box::new(ChaCha::new(key)?)),
            BulkCipher::Aes128Cbc | BulkCipher::Aes256Cbc => {
                RecordCipher::Block(Box::new(AesCbc::new(key)?))
            }
        };
        Ok(cipher)
    }
}

static TLS13_AES_128_GCM_SHA256: RustCryptoSuite =
    RustCryptoSuite(CipherSuite::TLS13_AES_128_GCM_SHA256);
static TLS13_AES_256_GCM_SHA384: RustCryptoSuite =
    RustCryptoSuite(CipherSuite::TLS13_AES_256_GCM_SHA384);
static TLS13_CHACHA20_POLY1305_SHA256: RustCryptoSuite =
    RustCryptoSuite(CipherSuite::TLS13_CHACHA20_POLY1305_SHA256);
static ECDHE_ECDSA_AES128_GCM_SHA256: RustCryptoSuite =
    RustCryptoSuite(CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256);
static ECDHE_RSA_AES128_GCM_SHA256: RustCryptoSuite =
    RustCryptoSuite(CipherSuite::ECDHE_RSA_AES128_GCM_SHA256);
static ECDHE_RSA_CHACHA20_POLY1305_SHA256: RustCryptoSuite =
    RustCryptoSuite(CipherSuite::ECDHE_RSA_CHACHA20_POLY1305_SHA256);
static ECDHE_RSA_AES128_CBC_SHA256: RustCryptoSuite =
    RustCryptoSuite(CipherSuite::ECDHE_RSA_AES128_CBC_SHA256);
static RSA_AES128_GCM_SHA256: RustCryptoSuite = RustCryptoSuite(CipherSuite::RSA_AES128_GCM_SHA256);
static RSA_AES128_CBC_SHA256: RustCryptoSuite = RustCryptoSuite(CipherSuite::RSA_AES128_CBC_SHA256);
static RSA_AES256_CBC_SHA256: RustCryptoSuite = RustCryptoSuite(CipherSuite::RSA_AES256_CBC_SHA256);

/// All supported cipher suites, in default server preference order.
pub(super) static ALL_CIPHER_SUITES: &[&dyn SupportedCipherSuite] = &[
    &TLS13_AES_128_GCM_SHA256,
    &TLS13_AES_256_GCM_SHA384,
    &TLS13_CHACHA20_POLY1305_SHA256,
    &ECDHE_ECDSA_AES128_GCM_SHA256,
    &ECDHE_RSA_AES128_GCM_SHA256,
    &ECDHE_RSA_CHACHA20_POLY1305_SHA256,
    &ECDHE_RSA_AES128_CBC_SHA256,
    &RSA_AES128_GCM_SHA256,
    &RSA_AES128_CBC_SHA256,
    &RSA_AES256_CBC_SHA256,
];
