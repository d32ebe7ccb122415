//! TLS 1.2 key derivation (RFC 5246 Sections 5, 6.3, 7.4.9 and RFC 7627).
//!
//! Thin wrappers over the provider's [`PrfProvider`](super::PrfProvider) that
//! fix the labels and seeds for each use.

use crate::buffer::Buf;
use crate::crypto::CryptoProvider;
use crate::suites::CipherSuiteDescriptor;
use crate::types::HashAlgorithm;
use crate::Error;

/// Length of the TLS 1.2 master secret.
pub const MASTER_SECRET_LEN: usize = 48;

/// Length of TLS 1.2 Finished verify data.
pub const VERIFY_DATA_LEN: usize = 12;

/// Which side sent a Finished message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Client,
    Server,
}

impl Sender {
    fn finished_label(&self) -> &'static str {
        match self {
            Sender::Client => "client finished",
            Sender::Server => "server finished",
        }
    }
}

/// PRF(secret, label, seed) truncated to `output_len`.
pub fn prf_tls12(
    provider: &CryptoProvider,
    hash: HashAlgorithm,
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
) -> Result<Buf, Error> {
    let mut out = Buf::with_capacity(output_len);
    let mut scratch = Buf::new();
    provider
        .prf_provider
        .prf_tls12(secret, label, seed, &mut out, output_len, &mut scratch, hash)
        .map_err(Error::CryptoError)?;
    scratch.zeroize();
    Ok(out)
}

/// master_secret = PRF(pre_master_secret, "master secret", client_random + server_random)[0..47]
pub fn master_secret(
    provider: &CryptoProvider,
    hash: HashAlgorithm,
    pre_master_secret: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<Buf, Error> {
    let mut seed = [0u8; 64];
    seed[..32].copy_from_slice(client_random);
    seed[32..].copy_from_slice(server_random);
    prf_tls12(
        provider,
        hash,
        pre_master_secret,
        "master secret",
        &seed,
        MASTER_SECRET_LEN,
    )
}

/// master_secret = PRF(pre_master_secret, "extended master secret", session_hash)[0..47]
///
/// `session_hash` is the transcript hash up to and including ClientKeyExchange.
pub fn extended_master_secret(
    provider: &CryptoProvider,
    hash: HashAlgorithm,
    pre_master_secret: &[u8],
    session_hash: &[u8],
) -> Result<Buf, Error> {
    prf_tls12(
        provider,
        hash,
        pre_master_secret,
        "extended master secret",
        session_hash,
        MASTER_SECRET_LEN,
    )
}

/// The TLS 1.2 key block split into its six parts.
///
/// Parts a suite does not use are empty: AEAD suites carry no MAC keys and
/// CBC suites no fixed IVs.
#[derive(Debug)]
pub struct KeyBlock {
    pub client_mac_key: Buf,
    pub server_mac_key: Buf,
    pub client_key: Buf,
    pub server_key: Buf,
    pub client_iv: Buf,
    pub server_iv: Buf,
}

impl Drop for KeyBlock {
    fn drop(&mut self) {
        self.client_mac_key.zeroize();
        self.server_mac_key.zeroize();
        self.client_key.zeroize();
        self.server_key.zeroize();
        self.client_iv.zeroize();
        self.server_iv.zeroize();
    }
}

/// key_block = PRF(master_secret, "key expansion", server_random + client_random)
///
/// Split in order: client MAC key, server MAC key, client key, server key,
/// client IV, server IV.
pub fn key_block(
    provider: &CryptoProvider,
    suite: &CipherSuiteDescriptor,
    master_secret: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<KeyBlock, Error> {
    let mut seed = [0u8; 64];
    seed[..32].copy_from_slice(server_random);
    seed[32..].copy_from_slice(client_random);

    let mut block = prf_tls12(
        provider,
        suite.hash,
        master_secret,
        "key expansion",
        &seed,
        suite.key_block_len(),
    )?;

    let mut at = 0;
    let mut take = |len: usize| {
        let part = Buf::from_slice(&block[at..at + len]);
        at += len;
        part
    };

    let kb = KeyBlock {
        client_mac_key: take(suite.mac_key_len),
        server_mac_key: take(suite.mac_key_len),
        client_key: take(suite.key_len),
        server_key: take(suite.key_len),
        client_iv: take(suite.fixed_iv_len),
        server_iv: take(suite.fixed_iv_len),
    };
    block.zeroize();
    Ok(kb)
}

/// verify_data = PRF(master_secret, finished_label, Hash(handshake_messages))[0..11]
pub fn verify_data(
    provider: &CryptoProvider,
    hash: HashAlgorithm,
    master_secret: &[u8],
    sender: Sender,
    handshake_hash: &[u8],
) -> Result<Buf, Error> {
    prf_tls12(
        provider,
        hash,
        master_secret,
        sender.finished_label(),
        handshake_hash,
        VERIFY_DATA_LEN,
    )
}
