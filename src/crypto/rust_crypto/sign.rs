//! Signing and key loading implementations using RustCrypto.

use p256::ecdsa::signature::Signer;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::DecodePrivateKey;
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, Pss, RsaPrivateKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::buffer::Buf;
use crate::crypto::provider::{KeyProvider, SigningKey};
use crate::types::{SignatureAlgorithm, SignatureScheme};

// ============================================================================
// RSA
// ============================================================================

const RSA_SCHEMES: &[SignatureScheme] = &[
    SignatureScheme::RsaPssRsaeSha256,
    SignatureScheme::RsaPssRsaeSha384,
    SignatureScheme::RsaPssRsaeSha512,
    SignatureScheme::RsaPkcs1Sha256,
    SignatureScheme::RsaPkcs1Sha384,
    SignatureScheme::RsaPkcs1Sha512,
];

/// RSA private key. Signs with PKCS#1 v1.5 or PSS and decrypts RSA key exchange.
struct RsaKey(Box<RsaPrivateKey>);

impl std::fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use rsa::traits::PublicKeyParts;
        f.debug_struct("RsaKey")
            .field("bits", &(self.0.size() * 8))
            .finish()
    }
}

impl SigningKey for RsaKey {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::RSA
    }

    fn public_key(&self) -> Result<Vec<u8>, String> {
        let der = self
            .0
            .to_public_key()
            .to_pkcs1_der()
            .map_err(|e| format!("RSA public key encoding failed: {}", e))?;
        Ok(der.as_bytes().to_vec())
    }

    fn supported_schemes(&self) -> &'static [SignatureScheme] {
        RSA_SCHEMES
    }

    fn sign(&self, scheme: SignatureScheme, message: &[u8], out: &mut Buf) -> Result<(), String> {
        let key = &self.0;
        let sig = match scheme {
            SignatureScheme::RsaPkcs1Sha256 => {
                key.sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(message))
            }
            SignatureScheme::RsaPkcs1Sha384 => {
                key.sign(Pkcs1v15Sign::new::<Sha384>(), &Sha384::digest(message))
            }
            SignatureScheme::RsaPkcs1Sha512 => {
                key.sign(Pkcs1v15Sign::new::<Sha512>(), &Sha512::digest(message))
            }
            SignatureScheme::RsaPssRsaeSha256 => {
                key.sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), &Sha256::digest(message))
            }
            SignatureScheme::RsaPssRsaeSha384 => {
                key.sign_with_rng(&mut OsRng, Pss::new::<Sha384>(), &Sha384::digest(message))
            }
            SignatureScheme::RsaPssRsaeSha512 => {
                key.sign_with_rng(&mut OsRng, Pss::new::<Sha512>(), &Sha512::digest(message))
            }
            _ => return Err(format!("RSA key cannot sign with {:?}", scheme)),
        }
        .map_err(|e| format!("RSA signing failed: {}", e))?;

        out.clear();
        out.extend_from_slice(&sig);
        Ok(())
    }

    fn decrypt(&self, ciphertext: &[u8], out: &mut Buf) -> Result<(), String> {
        let pt = self
            .0
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|e| format!("RSA decryption failed: {}", e))?;
        out.clear();
        out.extend_from_slice(&pt);
        Ok(())
    }
}

// ============================================================================
// ECDSA
// ============================================================================

/// ECDSA signing key implementation.
enum EcdsaSigningKey {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

impl std::fmt::Debug for EcdsaSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EcdsaSigningKey::P256(_) => f.debug_tuple("EcdsaSigningKey::P256").finish(),
            EcdsaSigningKey::P384(_) => f.debug_tuple("EcdsaSigningKey::P384").finish(),
        }
    }
}

impl SigningKey for EcdsaSigningKey {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::ECDSA
    }

    fn public_key(&self) -> Result<Vec<u8>, String> {
        let point = match self {
            EcdsaSigningKey::P256(key) => p256::PublicKey::from(key.verifying_key())
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            EcdsaSigningKey::P384(key) => p384::PublicKey::from(key.verifying_key())
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
        };
        Ok(point)
    }

    fn supported_schemes(&self) -> &'static [SignatureScheme] {
        match self {
            EcdsaSigningKey::P256(_) => &[SignatureScheme::EcdsaSecp256r1Sha256],
            EcdsaSigningKey::P384(_) => &[SignatureScheme::EcdsaSecp384r1Sha384],
        }
    }

    fn sign(&self, scheme: SignatureScheme, message: &[u8], out: &mut Buf) -> Result<(), String> {
        if !self.supported_schemes().contains(&scheme) {
            return Err(format!("ECDSA key cannot sign with {:?}", scheme));
        }
        out.clear();
        // The curve's digest is applied by the signer. Signatures go out DER encoded.
        match self {
            EcdsaSigningKey::P256(key) => {
                let sig: p256::ecdsa::Signature = key
                    .try_sign(message)
                    .map_err(|_| "Signing failed".to_string())?;
                out.extend_from_slice(sig.to_der().as_bytes());
            }
            EcdsaSigningKey::P384(key) => {
                let sig: p384::ecdsa::Signature = key
                    .try_sign(message)
                    .map_err(|_| "Signing failed".to_string())?;
                out.extend_from_slice(sig.to_der().as_bytes());
            }
        }
        Ok(())
    }
}

// ============================================================================
// Key loading
// ============================================================================

/// Key provider implementation.
#[derive(Debug)]
pub(super) struct RustCryptoKeyProvider;

impl KeyProvider for RustCryptoKeyProvider {
    fn load_private_key(&self, key_der: &[u8]) -> Result<Box<dyn SigningKey>, String> {
        // PKCS#8 first, it is what most tooling writes.
        if let Ok(key) = RsaPrivateKey::from_pkcs8_der(key_der) {
            return Ok(Box::new(RsaKey(Box::new(key))));
        }
        if let Ok(key) = p256::ecdsa::SigningKey::from_pkcs8_der(key_der) {
            return Ok(Box::new(EcdsaSigningKey::P256(key)));
        }
        if let Ok(key) = p384::ecdsa::SigningKey::from_pkcs8_der(key_der) {
            return Ok(Box::new(EcdsaSigningKey::P384(key)));
        }

        // PKCS#1 RSAPrivateKey
        if let Ok(key) = RsaPrivateKey::from_pkcs1_der(key_der) {
            return Ok(Box::new(RsaKey(Box::new(key))));
        }

        // SEC1 ECPrivateKey (OpenSSL EC private key format)
        if let Ok(secret) = p256::SecretKey::from_sec1_der(key_der) {
            return Ok(Box::new(EcdsaSigningKey::P256(secret.into())));
        }
        if let Ok(secret) = p384::SecretKey::from_sec1_der(key_der) {
            return Ok(Box::new(EcdsaSigningKey::P384(secret.into())));
        }

        Err("Failed to parse private key in any supported format".to_string())
    }
}

/// Static instance of the key provider.
pub(super) static KEY_PROVIDER: RustCryptoKeyProvider = RustCryptoKeyProvider;
